use log::debug;
use serde::Serialize;

use crate::batching::tokens::estimate_tokens;

// @module: Token-budget packer

// @struct: One named text unit to be packed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextUnit {
    pub name: String,
    pub text: String,
}

impl TextUnit {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

// @struct: Ordered group of units bounded by the token budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    // @field: 1-based chunk number
    pub index: usize,

    // @field: Units in input order
    #[serde(skip)]
    pub units: Vec<TextUnit>,

    // @field: Sum of the units' estimates
    pub estimated_tokens: usize,
}

impl Chunk {
    /// Names of the included units, in order
    pub fn unit_names(&self) -> Vec<String> {
        self.units.iter().map(|u| u.name.clone()).collect()
    }

    /// True for a singleton whose only unit exceeds `budget` by itself
    pub fn is_oversized(&self, budget: usize) -> bool {
        self.units.len() == 1 && self.estimated_tokens > budget
    }
}

/// Greedy, order-preserving packer.
///
/// A unit that would push the current chunk over budget closes it. A unit
/// whose own estimate exceeds the budget becomes a singleton chunk; units are
/// never split and never dropped.
#[derive(Debug, Clone, Copy)]
pub struct Packer {
    max_tokens: usize,
}

impl Packer {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn pack(&self, units: Vec<TextUnit>) -> Vec<Chunk> {
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current: Vec<TextUnit> = Vec::new();
        let mut current_tokens = 0;

        let close = |chunks: &mut Vec<Chunk>, units: Vec<TextUnit>, tokens: usize| {
            if !units.is_empty() {
                chunks.push(Chunk {
                    index: chunks.len() + 1,
                    units,
                    estimated_tokens: tokens,
                });
            }
        };

        for unit in units {
            let tokens = estimate_tokens(&unit.text);

            // Oversized unit gets its own chunk
            if tokens > self.max_tokens {
                debug!("Unit {} ({} tokens) exceeds budget {}", unit.name, tokens, self.max_tokens);
                close(&mut chunks, std::mem::take(&mut current), current_tokens);
                current_tokens = 0;
                close(&mut chunks, vec![unit], tokens);
                continue;
            }

            if current_tokens + tokens > self.max_tokens {
                close(&mut chunks, std::mem::take(&mut current), current_tokens);
                current_tokens = 0;
            }

            current_tokens += tokens;
            current.push(unit);
        }
        close(&mut chunks, current, current_tokens);

        chunks
    }
}
