mod common;

use common::{assert_same_atext, random_atext, random_doc};
use pad_changeset::fuzzer::{two_prop_pool, Fuzzer};
use pad_changeset::{apply_to_atext, apply_to_text, check_rep, compose, AttributePool};

#[test]
fn compose_is_associative() {
    let mut pool = AttributePool::new();
    for seed in 0..100 {
        let mut fuzzer = Fuzzer::from_u64(seed);
        let start = random_doc(&mut fuzzer);
        let (x1, text1) = fuzzer.random_changeset(&start, false);
        let (x2, text2) = fuzzer.random_changeset(&text1, false);
        let (x3, text3) = fuzzer.random_changeset(&text2, false);

        let x12 = compose(&x1, &x2, &mut pool).unwrap();
        let x23 = compose(&x2, &x3, &mut pool).unwrap();
        let left = compose(&x12, &x3, &mut pool).unwrap();
        let right = compose(&x1, &x23, &mut pool).unwrap();
        check_rep(&left.to_string()).unwrap();
        check_rep(&right.to_string()).unwrap();
        assert_eq!(left, right, "seed {seed}");

        assert_eq!(apply_to_text(&x12, &start).unwrap(), text2);
        assert_eq!(apply_to_text(&x23, &text1).unwrap(), text3);
        assert_eq!(apply_to_text(&left, &start).unwrap(), text3);
    }
}

#[test]
fn composed_attributes_match_stepwise_application() {
    for seed in 0..100 {
        let mut fuzzer = Fuzzer::from_u64(1000 + seed);
        let mut pool = two_prop_pool();
        let start = random_atext(&mut fuzzer, &mut pool);
        let (x1, _) = fuzzer.random_changeset(&start.text, true);
        let mid = apply_to_atext(&x1, &start, &mut pool).unwrap();
        let (x2, _) = fuzzer.random_changeset(&mid.text, true);
        let end = apply_to_atext(&x2, &mid, &mut pool).unwrap();

        let x12 = compose(&x1, &x2, &mut pool).unwrap();
        check_rep(&x12.to_string()).unwrap();
        let direct = apply_to_atext(&x12, &start, &mut pool).unwrap();
        assert_same_atext(&direct, &end, &pool);
    }
}
