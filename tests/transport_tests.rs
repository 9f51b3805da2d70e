// Tests for the wire message shapes and the transport handle semantics.

use base64::Engine;
use voicelink::audio::encode_frame;
use voicelink::transport::{
    AudioMessage, ServerEvent, ServerMessage, SessionDirectives, SetupMessage, TransportHandle,
};

fn directives() -> SessionDirectives {
    SessionDirectives {
        system_instruction: "Answer briefly.".to_string(),
        voice: "Kore".to_string(),
        temperature: 0.0,
        disable_thinking: true,
        input_sample_rate: 16000,
    }
}

#[test]
fn test_outbound_frame_shape() {
    let payload = encode_frame(&[0.0, 0.5, -0.5], 16000);
    let message = AudioMessage::from_payload(&payload);
    let json = serde_json::to_string(&message).unwrap();

    assert!(json.contains("\"realtimeInput\""));
    assert!(json.contains("\"mimeType\":\"audio/pcm;rate=16000\""));

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(&message.realtime_input.media.data)
        .unwrap();
    assert_eq!(decoded, payload.data);
}

#[test]
fn test_setup_message_pins_audio_and_determinism() {
    let json = serde_json::to_string(&SetupMessage::from_directives(&directives())).unwrap();

    assert!(json.contains("\"systemInstruction\":\"Answer briefly.\""));
    assert!(json.contains("\"responseModalities\":[\"AUDIO\"]"));
    assert!(json.contains("\"temperature\":0"));
    assert!(json.contains("\"thinkingBudget\":0"));
    assert!(json.contains("\"voiceName\":\"Kore\""));
    assert!(json.contains("\"inputAudioTranscription\":{}"));
    assert!(json.contains("\"outputAudioTranscription\":{}"));
}

#[test]
fn test_inbound_audio_part_becomes_chunk_event() {
    let pcm = vec![1u8, 0, 2, 0, 3, 0];
    let encoded = base64::engine::general_purpose::STANDARD.encode(&pcm);
    let json = format!(
        r#"{{"serverContent":{{"modelTurn":{{"parts":[{{"inlineData":{{"mimeType":"audio/pcm;rate=24000","data":"{encoded}"}}}}]}}}}}}"#
    );

    let message: ServerMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(message.into_events(), vec![ServerEvent::AudioChunk(pcm)]);
}

#[test]
fn test_inbound_transcripts_and_turn_complete_order() {
    let json = r#"{
        "serverContent": {
            "inputTranscription": { "text": "Hel" },
            "outputTranscription": { "text": "Hi" },
            "turnComplete": true
        }
    }"#;

    let message: ServerMessage = serde_json::from_str(json).unwrap();
    assert_eq!(
        message.into_events(),
        vec![
            ServerEvent::InputTranscriptDelta("Hel".to_string()),
            ServerEvent::OutputTranscriptDelta("Hi".to_string()),
            ServerEvent::TurnComplete,
        ]
    );
}

#[test]
fn test_interruption_preempts_everything_else() {
    let json = r#"{
        "serverContent": {
            "interrupted": true,
            "turnComplete": true,
            "outputTranscription": { "text": "cut off" }
        }
    }"#;

    let message: ServerMessage = serde_json::from_str(json).unwrap();
    assert_eq!(message.into_events(), vec![ServerEvent::Interrupted]);
}

#[test]
fn test_empty_or_unknown_content_yields_no_events() {
    let empty: ServerMessage = serde_json::from_str("{}").unwrap();
    assert!(empty.into_events().is_empty());

    let unknown: ServerMessage =
        serde_json::from_str(r#"{"serverContent":{"somethingNew":42}}"#).unwrap();
    assert!(unknown.into_events().is_empty());

    let blank_text: ServerMessage =
        serde_json::from_str(r#"{"serverContent":{"inputTranscription":{"text":""}}}"#).unwrap();
    assert!(blank_text.into_events().is_empty());
}

#[tokio::test]
async fn test_handle_delivers_frames_to_the_wires() {
    let (handle, mut wires) = TransportHandle::pair();
    let payload = encode_frame(&[0.25; 16], 16000);

    assert!(handle.send(payload.clone()));
    let shipped = wires.outbound.recv().await.unwrap();
    assert_eq!(shipped, payload);
}

#[tokio::test]
async fn test_send_after_close_is_a_silent_no_op() {
    let (handle, mut wires) = TransportHandle::pair();

    handle.close();
    assert!(handle.is_closed());
    assert!(!handle.send(encode_frame(&[0.0; 16], 16000)));

    // Nothing reached the wire.
    assert!(wires.outbound.try_recv().is_err());
}

#[tokio::test]
async fn test_close_is_idempotent_and_observable() {
    let (handle, wires) = TransportHandle::pair();
    let mut closed = wires.closed.clone();

    handle.close();
    handle.close();

    closed.changed().await.unwrap();
    assert!(*closed.borrow());
}

#[tokio::test]
async fn test_send_survives_a_dead_wire() {
    let (handle, wires) = TransportHandle::pair();
    drop(wires);

    // The wire is gone; the frame is dropped without an error escaping.
    assert!(!handle.send(encode_frame(&[0.0; 16], 16000)));
}

#[tokio::test]
async fn test_events_flow_to_the_handle() {
    let (mut handle, wires) = TransportHandle::pair();

    wires
        .events
        .send(ServerEvent::TurnComplete)
        .await
        .unwrap();
    assert_eq!(handle.recv().await, Some(ServerEvent::TurnComplete));

    drop(wires);
    assert_eq!(handle.recv().await, None);
}
