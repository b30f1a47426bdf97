/*!
 * Tests for token estimation and the token-budget packer
 */

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use manuscript::batching::{Packer, TextUnit, estimate_tokens};

fn random_text(rng: &mut StdRng, max_len: usize) -> String {
    let len = rng.random_range(0..=max_len);
    (0..len)
        .map(|_| match rng.random_range(0..3) {
            0 => 'a',
            1 => 'あ',
            _ => '한',
        })
        .collect()
}

/// Chunks preserve order, drop nothing and stay within budget unless a
/// single unit is oversized by itself
#[test]
fn test_pack_withRandomUnits_shouldRespectBudgetAndOrder() {
    let mut rng = StdRng::seed_from_u64(2024);

    for _ in 0..200 {
        let budget = rng.random_range(1..=400);
        let units: Vec<TextUnit> = (0..rng.random_range(0..=30))
            .map(|i| TextUnit::new(format!("f{:03}", i), random_text(&mut rng, 600)))
            .collect();
        let names: Vec<String> = units.iter().map(|u| u.name.clone()).collect();

        let chunks = Packer::new(budget).pack(units);

        let packed: Vec<String> = chunks.iter().flat_map(|c| c.unit_names()).collect();
        assert_eq!(packed, names);

        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i + 1);
            assert!(!chunk.units.is_empty());
            let sum: usize = chunk.units.iter().map(|u| estimate_tokens(&u.text)).sum();
            assert_eq!(chunk.estimated_tokens, sum);
            assert!(chunk.estimated_tokens <= budget || chunk.units.len() == 1);
            assert_eq!(chunk.is_oversized(budget), chunk.estimated_tokens > budget);
        }
    }
}

/// A unit larger than the budget travels alone
#[test]
fn test_pack_withOversizedUnit_shouldEmitSingleton() {
    let units = vec![
        TextUnit::new("a", "x".repeat(40)),
        TextUnit::new("big", "x".repeat(4000)),
        TextUnit::new("b", "x".repeat(40)),
    ];

    let chunks = Packer::new(100).pack(units);

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[1].unit_names(), vec!["big"]);
    assert!(chunks[1].is_oversized(100));
    assert!(!chunks[0].is_oversized(100));
}

#[test]
fn test_pack_withNoUnits_shouldReturnNoChunks() {
    assert!(Packer::new(10).pack(Vec::new()).is_empty());
}

/// CJK characters weigh more than Latin characters
#[test]
fn test_estimate_tokens_withJapaneseAndEnglish_shouldWeightByScript() {
    assert_eq!(estimate_tokens(&"a".repeat(400)), 100);
    assert_eq!(estimate_tokens(&"あ".repeat(300)), 200);
    assert_eq!(estimate_tokens(&"한".repeat(3)), 2);
}
