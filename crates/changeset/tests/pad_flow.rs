mod common;

use common::random_doc;
use pad_changeset::fuzzer::Fuzzer;
use pad_changeset::{
    apply_to_text, follow, AttributePool, Changeset, MemoryRevisionStore, Pad, PadOptions, RevisionStore,
};

fn new_pad(text: &str, key_revision_interval: usize) -> Pad<MemoryRevisionStore> {
    let options = PadOptions {
        key_revision_interval,
        initial_text: text.to_string(),
        ..PadOptions::default()
    };
    Pad::new(MemoryRevisionStore::new(), options).unwrap()
}

#[test]
fn two_clients_converge_with_the_server() {
    let no_attribs = AttributePool::new();
    for seed in 0..50 {
        let mut fuzzer = Fuzzer::from_u64(seed);
        let mut pad = new_pad(fuzzer.random_multiline(5, 20).trim_end_matches('\n'), 100);
        let base_rev = pad.head();
        let base = pad.text().to_string();

        let (a, text_a) = fuzzer.random_changeset(&base, false);
        let (b, text_b) = fuzzer.random_changeset(&base, false);
        if text_a == base {
            // The pad stores no revision for a change that changes nothing.
            continue;
        }
        pad.accept_changeset(base_rev, &a.to_string(), &no_attribs, "alice").unwrap();
        pad.accept_changeset(base_rev, &b.to_string(), &no_attribs, "bob").unwrap();

        // Each client applies its own edit, then the other one rebased over it.
        let mut scratch = AttributePool::new();
        let a_seen_by_b = follow(&b, &a, true, &mut scratch).unwrap();
        let b_seen_by_a = follow(&a, &b, false, &mut scratch).unwrap();
        assert_eq!(apply_to_text(&a_seen_by_b, &text_b).unwrap(), pad.text(), "seed {seed}");
        assert_eq!(apply_to_text(&b_seen_by_a, &text_a).unwrap(), pad.text(), "seed {seed}");
    }
}

#[test]
fn stale_edits_from_many_clients() {
    let no_attribs = AttributePool::new();
    let mut fuzzer = Fuzzer::from_u64(77);
    let mut pad = new_pad(random_doc(&mut fuzzer).trim_end_matches('\n'), 4);
    let authors = ["alice", "bob", "carol"];

    for _ in 0..40 {
        let base_rev = fuzzer.random_int(pad.head() + 1);
        let base = pad.atext_at(base_rev).unwrap();
        let (cs, _) = fuzzer.random_changeset(&base.text, false);
        let author = *fuzzer.pick(&authors);
        pad.accept_changeset(base_rev, &cs.to_string(), &no_attribs, author).unwrap();
        assert!(pad.text().ends_with('\n'));
    }

    let head = pad.head();
    assert_eq!(&pad.atext_at(head).unwrap(), pad.atext());
    let all = pad.compose_range(0, head).unwrap();
    let first = pad.atext_at(0).unwrap();
    assert_eq!(apply_to_text(&all, &first.text).unwrap(), pad.text());

    let mut authors_seen = pad.all_authors();
    authors_seen.sort();
    assert!(authors_seen.iter().all(|a| authors.contains(&a.as_str())));
}

#[test]
fn key_revisions_carry_snapshots() {
    let mut pad = new_pad("x", 3);
    for i in 0..7 {
        pad.append_text(&i.to_string(), "alice").unwrap();
    }
    assert_eq!(pad.head(), 7);
    assert_eq!(pad.text(), "x0123456\n");
    for rev in 0..=7 {
        let record = pad.store().get_revision(rev).unwrap();
        assert_eq!(record.meta.atext.is_some(), rev % 3 == 0, "rev {rev}");
        assert_eq!(record.meta.pool.is_some(), rev % 3 == 0, "rev {rev}");
    }
    assert_eq!(pad.atext_at(5).unwrap().text, "x01234\n");
}

#[test]
fn author_attributes_move_into_the_pad_pool() {
    let mut pad = new_pad("hello", 100);
    pad.pool_mut().put_attrib("bold", "true");

    let wire_pool: AttributePool = [("author", "a2")].into_iter().collect();
    let head = pad.accept_changeset(0, "Z:6>1=5*0+1$!", &wire_pool, "a2").unwrap();
    assert_eq!(head, 1);
    assert_eq!(pad.text(), "hello!\n");
    assert_eq!(pad.pool().lookup("bold", "true"), Some(0));
    let author = pad.pool().lookup("author", "a2").unwrap();
    let stored = Changeset::parse(&pad.store().get_revision(1).unwrap().changeset).unwrap();
    assert_eq!(stored.ops[1].attribs.as_slice(), &[author]);
    assert_eq!(pad.all_authors(), vec!["a2".to_string()]);

    let err = pad.accept_changeset(1, "Z:7>1*0+1$?", &wire_pool, "mallory");
    assert!(err.is_err());
    assert_eq!(pad.head(), 1);
}
