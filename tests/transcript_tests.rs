// Unit tests for per-speaker turn assembly.

use voicelink::transcript::{Speaker, TranscriptAssembler};

#[test]
fn test_deltas_accumulate_under_one_turn_id() {
    let mut assembler = TranscriptAssembler::new();

    let first = assembler.apply_delta(Speaker::Source, "Hel").unwrap();
    assert_eq!(first.text, "Hel");

    let second = assembler.apply_delta(Speaker::Source, "lo").unwrap();
    assert_eq!(second.text, "Hello");
    assert_eq!(second.turn_id, first.turn_id);
    assert_eq!(second.started_at, first.started_at);
}

#[test]
fn test_turn_complete_opens_a_fresh_id() {
    let mut assembler = TranscriptAssembler::new();

    let before = assembler.apply_delta(Speaker::Source, "Hello").unwrap();
    assembler.complete_turn();
    let after = assembler.apply_delta(Speaker::Source, "Hi").unwrap();

    assert_ne!(after.turn_id, before.turn_id);
    assert_eq!(after.text, "Hi");
}

#[test]
fn test_speakers_keep_independent_turns() {
    let mut assembler = TranscriptAssembler::new();

    let source = assembler.apply_delta(Speaker::Source, "question").unwrap();
    let agent = assembler.apply_delta(Speaker::Agent, "answer").unwrap();

    assert_ne!(source.turn_id, agent.turn_id);
    assert_eq!(assembler.open_turns(), 2);

    // Interleaved deltas extend their own speaker's turn only.
    let source_again = assembler.apply_delta(Speaker::Source, "?").unwrap();
    assert_eq!(source_again.turn_id, source.turn_id);
    assert_eq!(source_again.text, "question?");

    let agent_again = assembler.apply_delta(Speaker::Agent, ".").unwrap();
    assert_eq!(agent_again.turn_id, agent.turn_id);
    assert_eq!(agent_again.text, "answer.");
}

#[test]
fn test_never_more_than_two_open_turns() {
    let mut assembler = TranscriptAssembler::new();
    assert_eq!(assembler.open_turns(), 0);

    for _ in 0..5 {
        assembler.apply_delta(Speaker::Source, "a");
        assembler.apply_delta(Speaker::Agent, "b");
        assert_eq!(assembler.open_turns(), 2);
    }

    assembler.complete_turn();
    assert_eq!(assembler.open_turns(), 0);
}

#[test]
fn test_turn_complete_closes_both_speakers() {
    let mut assembler = TranscriptAssembler::new();
    let source = assembler.apply_delta(Speaker::Source, "one").unwrap();
    let agent = assembler.apply_delta(Speaker::Agent, "two").unwrap();

    assembler.complete_turn();

    let new_source = assembler.apply_delta(Speaker::Source, "three").unwrap();
    let new_agent = assembler.apply_delta(Speaker::Agent, "four").unwrap();
    assert_ne!(new_source.turn_id, source.turn_id);
    assert_ne!(new_agent.turn_id, agent.turn_id);
    assert_eq!(new_source.text, "three");
    assert_eq!(new_agent.text, "four");
}

#[test]
fn test_empty_delta_does_not_open_a_turn() {
    let mut assembler = TranscriptAssembler::new();

    assert!(assembler.apply_delta(Speaker::Source, "").is_none());
    assert_eq!(assembler.open_turns(), 0);

    // The first real delta still gets a fresh turn.
    let update = assembler.apply_delta(Speaker::Source, "text").unwrap();
    assert_eq!(update.text, "text");
}

#[test]
fn test_turn_ids_never_repeat() {
    let mut assembler = TranscriptAssembler::new();
    let mut seen = Vec::new();

    for _ in 0..10 {
        let source = assembler.apply_delta(Speaker::Source, "s").unwrap();
        let agent = assembler.apply_delta(Speaker::Agent, "a").unwrap();
        seen.push(source.turn_id);
        seen.push(agent.turn_id);
        assembler.complete_turn();
    }

    let mut deduped = seen.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), seen.len());
}

#[test]
fn test_complete_turn_when_idle_is_harmless() {
    let mut assembler = TranscriptAssembler::new();
    assembler.complete_turn();
    assembler.complete_turn();
    assert_eq!(assembler.open_turns(), 0);
}
