mod common;

use pad_changeset::fuzzer::Fuzzer;
use pad_changeset::num::{num_to_string, parse_num};
use pad_changeset::{apply_to_text, compose, AttributePool, Attribs, Changeset};
use proptest::prelude::*;

fn arb_attribs() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..5000, 0..6)
}

/// A random document and a random changeset over it, drawn from a seeded
/// fuzzer.
fn doc_and_changeset(seed: u64) -> (String, Changeset, String) {
    let mut fuzzer = Fuzzer::from_u64(seed);
    let doc = common::random_doc(&mut fuzzer);
    let (cs, out) = fuzzer.random_changeset(&doc, false);
    (doc, cs, out)
}

proptest! {
    #[test]
    fn prop_radix36_round_trip(n in 0usize..=u32::MAX as usize) {
        let s = num_to_string(n);
        prop_assert!(s.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        prop_assert_eq!(parse_num(&s).unwrap(), n);
    }

    #[test]
    fn prop_attribs_display_parses_back(nums in arb_attribs()) {
        let attribs = Attribs::from(nums);
        prop_assert_eq!(Attribs::parse(&attribs.to_string()).unwrap(), attribs);
    }

    #[test]
    fn prop_changeset_text_parses_back(seed in any::<u64>()) {
        let (_, cs, _) = doc_and_changeset(seed);
        prop_assert_eq!(Changeset::parse(&cs.to_string()).unwrap(), cs);
    }

    #[test]
    fn prop_apply_produces_new_len(seed in any::<u64>()) {
        let (doc, cs, out) = doc_and_changeset(seed);
        prop_assert_eq!(doc.chars().count(), cs.old_len);
        let applied = apply_to_text(&cs, &doc).unwrap();
        prop_assert_eq!(applied.chars().count(), cs.new_len);
        prop_assert_eq!(applied, out);
    }

    #[test]
    fn prop_identity_is_neutral_for_compose(seed in any::<u64>()) {
        let (_, cs, _) = doc_and_changeset(seed);
        let mut pool = AttributePool::new();
        let before = Changeset::identity(cs.old_len);
        let after = Changeset::identity(cs.new_len);
        prop_assert_eq!(&compose(&before, &cs, &mut pool).unwrap(), &cs);
        prop_assert_eq!(&compose(&cs, &after, &mut pool).unwrap(), &cs);
    }
}
