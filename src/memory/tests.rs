use super::*;

#[test]
fn appends_preserve_chronological_order() {
    let mut memory = ConversationMemory::default();
    memory.append("first?", "one");
    memory.append("second?", "two");

    let pairs = memory.as_pairs();
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].question, "first?");
    assert_eq!(pairs[1].question, "second?");
}

#[test]
fn window_evicts_oldest_first() {
    let mut memory = ConversationMemory::new(5);
    for i in 0..8 {
        memory.append(&format!("q{}", i), &format!("a{}", i));
    }

    assert_eq!(memory.len(), 5);
    let pairs = memory.as_pairs();
    assert_eq!(pairs[0].question, "q3");
    assert_eq!(pairs[4].question, "q7");
}

#[test]
fn length_never_exceeds_window() {
    let mut memory = ConversationMemory::new(2);
    for i in 0..100 {
        memory.append(&format!("q{}", i), "a");
        assert!(memory.len() <= 2);
    }
}

#[test]
fn zero_window_retains_nothing() {
    let mut memory = ConversationMemory::new(0);
    memory.append("q", "a");
    assert!(memory.is_empty());
}

#[test]
fn clear_empties_memory() {
    let mut memory = ConversationMemory::default();
    memory.append("q", "a");
    memory.clear();
    assert!(memory.is_empty());
}
