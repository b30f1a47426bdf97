/*!
 * Tests for the structural splitter
 */

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use manuscript::app_config::ProloguePolicy;
use manuscript::document::markup::MarkupDocument;
use manuscript::document::merger::merge_contents;
use manuscript::document::{Splitter, partition_sizes};
use crate::common;

/// Partition law over many (count, parts) pairs
#[test]
fn test_partition_sizes_withRandomInputs_shouldObeyPartitionLaw() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..500 {
        let count = rng.random_range(0..=200);
        let parts = rng.random_range(1..=12);
        let sizes = partition_sizes(count, parts);

        let expected_parts = parts.min(count.max(1));
        assert_eq!(sizes.len(), expected_parts, "count={} parts={}", count, parts);
        assert_eq!(sizes.iter().sum::<usize>(), count);

        let base = count / expected_parts;
        let (last, rest) = sizes.split_last().unwrap();
        assert!(rest.iter().all(|&size| size == base));
        assert!(*last >= base);
        if count > 0 {
            assert!(sizes.iter().all(|&size| size > 0));
        }
    }
}

/// Ten units into four parts: the last fragment absorbs the remainder
#[test]
fn test_split_withTenUnitsFourParts_shouldGiveTwoTwoTwoFour() {
    let document = common::xhtml_document("t", &common::paragraphs("unit", 10));
    let fragments = Splitter::new(4, ProloguePolicy::EveryFragment)
        .split("ch01.xhtml", &document)
        .unwrap();

    let sizes: Vec<usize> = fragments.iter().map(|f| f.units.len()).collect();
    assert_eq!(sizes, vec![2, 2, 2, 4]);
    assert!(fragments.iter().all(|f| f.total_sections == 4));
    assert!(fragments.iter().all(|f| f.parent_document_id == "ch01.xhtml"));
    assert_eq!(fragments[3].units[3], "<p id=\"p10\">unit 10</p>");
}

/// Two units and four requested parts yield two fragments
#[test]
fn test_split_withFewerUnitsThanParts_shouldYieldOneUnitPerFragment() {
    let document = common::xhtml_document("t", &common::paragraphs("unit", 2));
    let fragments = Splitter::new(4, ProloguePolicy::EveryFragment)
        .split("short", &document)
        .unwrap();

    assert_eq!(fragments.len(), 2);
    assert!(fragments.iter().all(|f| f.total_sections == 2 && f.units.len() == 1));
}

/// An empty body yields a single, empty fragment
#[test]
fn test_split_withEmptyBody_shouldYieldOneEmptyFragment() {
    let document = common::xhtml_document("t", &[]);
    let fragments = Splitter::new(4, ProloguePolicy::EveryFragment)
        .split("empty", &document)
        .unwrap();

    assert_eq!(fragments.len(), 1);
    assert!(fragments[0].units.is_empty());
    assert!(MarkupDocument::parse("fragment", &fragments[0].content).is_ok());
}

/// Every fragment is itself a parseable document
#[test]
fn test_split_shouldProduceStandaloneFragments() {
    let document = common::xhtml_document("t", &common::paragraphs("unit", 9));
    let fragments = Splitter::new(3, ProloguePolicy::EveryFragment)
        .split("doc", &document)
        .unwrap();

    for fragment in &fragments {
        let parsed = MarkupDocument::parse("fragment", &fragment.content).unwrap();
        assert_eq!(parsed.units, fragment.units);
        assert!(parsed.prologue.as_deref().unwrap().starts_with("<?xml"));
        assert!(parsed.header.ends_with("<body class=\"main\">"));
    }
}

/// A document with no content container fails with a structure error
#[test]
fn test_split_withoutBody_shouldFail() {
    let result = Splitter::new(2, ProloguePolicy::EveryFragment).split("nobody", "<html><div>x</div></html>");
    assert!(result.is_err());

    let result = Splitter::new(2, ProloguePolicy::EveryFragment).split("broken", "<html><body><p>x</p>");
    assert!(result.is_err());
}

/// Splitting then merging the untouched fragments reproduces the document
#[test]
fn test_split_thenMerge_withRandomDocuments_shouldRoundTrip() {
    let mut rng = StdRng::seed_from_u64(42);

    for round in 0..60 {
        let unit_count = rng.random_range(0..=40);
        let units: Vec<String> = (0..unit_count)
            .map(|i| match rng.random_range(0..4) {
                0 => format!("<p>段落 {}</p>", i),
                1 => format!("<div class=\"d{}\"><p>nested {}</p><span>x</span></div>", i, i),
                2 => "<hr/>".to_string(),
                _ => format!("<!-- note {} -->", i),
            })
            .collect();
        let document = common::xhtml_document("round", &units);
        let parts = rng.random_range(1..=8);
        let policy = if round % 2 == 0 {
            ProloguePolicy::EveryFragment
        } else {
            ProloguePolicy::FirstOnly
        };

        let fragments = Splitter::new(parts, policy).split("doc", &document).unwrap();
        let contents: Vec<String> = fragments.into_iter().map(|f| f.content).collect();
        let merged = merge_contents("doc", &contents).unwrap();

        let original = MarkupDocument::parse("original", &document).unwrap();
        let reassembled = MarkupDocument::parse("merged", &merged).unwrap();
        assert_eq!(reassembled.units, original.units, "round {}", round);
        assert_eq!(reassembled.prologue, original.prologue);
        assert_eq!(reassembled.header, original.header);
        assert_eq!(merged, original.to_markup());
    }
}
