//! Emits the bookkeeping a read routine uses to notice missing required
//! fields: one bit per tracked field, packed into machine words.

use crate::error::BitsetError;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordWidth {
    W8,
    W16,
    W32,
    W64,
}

impl WordWidth {
    pub fn bits(self) -> usize {
        match self {
            WordWidth::W8 => 8,
            WordWidth::W16 => 16,
            WordWidth::W32 => 32,
            WordWidth::W64 => 64,
        }
    }

    pub fn rust_type(self) -> &'static str {
        match self {
            WordWidth::W8 => "u8",
            WordWidth::W16 => "u16",
            WordWidth::W32 => "u32",
            WordWidth::W64 => "u64",
        }
    }

    /// The narrowest word holding `count` bits, or 64-bit words when no
    /// single word can.
    pub fn for_count(count: usize) -> WordWidth {
        match count {
            0..=8 => WordWidth::W8,
            9..=16 => WordWidth::W16,
            17..=32 => WordWidth::W32,
            _ => WordWidth::W64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BitsetTracker {
    var:   String,
    width: WordWidth,
    keys:  Vec<String>,
    index: HashMap<String, usize>,
}

impl BitsetTracker {
    pub fn new(var: &str, width: WordWidth) -> BitsetTracker {
        BitsetTracker {
            var: var.to_string(),
            width,
            keys: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Starts tracking `key`, returning its bit position.
    pub fn add(&mut self, key: &str) -> Result<usize, BitsetError> {
        if self.index.contains_key(key) {
            return Err(BitsetError::DuplicateKey(key.to_string()));
        }
        let bit = self.keys.len();
        self.keys.push(key.to_string());
        self.index.insert(key.to_string(), bit);
        Ok(bit)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn word_count(&self) -> usize {
        (self.keys.len() + self.width.bits() - 1) / self.width.bits()
    }

    fn word(&self, word: usize) -> String {
        if self.word_count() == 1 {
            self.var.clone()
        } else {
            format!("{}[{}]", self.var, word)
        }
    }

    fn locate(&self, key: &str) -> Result<(usize, usize), BitsetError> {
        let bit = *self
            .index
            .get(key)
            .ok_or_else(|| BitsetError::UnknownKey(key.to_string()))?;
        Ok((bit / self.width.bits(), bit % self.width.bits()))
    }

    /// `let mut` statement for the words; empty when nothing is tracked.
    pub fn emit_declaration(&self) -> String {
        let ty = self.width.rust_type();
        match self.word_count() {
            0 => String::new(),
            1 => format!("let mut {}: {} = 0;", self.var, ty),
            n => format!("let mut {}: [{}; {}] = [0; {}];", self.var, ty, n, n),
        }
    }

    pub fn emit_set_bit(&self, key: &str) -> Result<String, BitsetError> {
        let (word, bit) = self.locate(key)?;
        Ok(format!("{} |= 1 << {};", self.word(word), bit))
    }

    /// One `if` per tracked key whose bit is clear, in tracking order, with
    /// `body` supplying the statements for a missing key. Words with more
    /// than half their bits tracked get a guard that skips every test when
    /// all of them are set.
    pub fn emit_absence_checks<F>(&self, mut body: F) -> Vec<String>
    where
        F: FnMut(&str) -> String,
    {
        let bits = self.width.bits();
        let mut lines = Vec::new();
        for (word, keys) in self.keys.chunks(bits).enumerate() {
            let dense = keys.len() > bits / 2;
            let indent = if dense { "    " } else { "" };
            if dense {
                let mask: u64 = match keys.len() {
                    64 => u64::MAX,
                    n => (1u64 << n) - 1,
                };
                lines.push(format!("if {} != {:#x} {{", self.word(word), mask));
            }
            for (bit, key) in keys.iter().enumerate() {
                lines.push(format!("{}if ({} & (1 << {})) == 0 {{", indent, self.word(word), bit));
                for line in body(key).lines() {
                    lines.push(format!("{}    {}", indent, line));
                }
                lines.push(format!("{}}}", indent));
            }
            if dense {
                lines.push("}".to_string());
            }
        }
        lines
    }
}

#[test]
fn width_selection() {
    assert_eq!(WordWidth::for_count(1), WordWidth::W8);
    assert_eq!(WordWidth::for_count(9), WordWidth::W16);
    assert_eq!(WordWidth::for_count(32), WordWidth::W32);
    assert_eq!(WordWidth::for_count(33), WordWidth::W64);
    assert_eq!(WordWidth::for_count(200), WordWidth::W64);
}

#[test]
fn duplicate_and_unknown_keys() {
    let mut bits = BitsetTracker::new("isset", WordWidth::W8);
    assert_eq!(bits.add("a"), Ok(0));
    assert_eq!(bits.add("b"), Ok(1));
    assert_eq!(bits.add("a"), Err(BitsetError::DuplicateKey("a".to_string())));
    assert_eq!(bits.emit_set_bit("c"), Err(BitsetError::UnknownKey("c".to_string())));
}

#[test]
fn single_word() {
    let mut bits = BitsetTracker::new("isset", WordWidth::W8);
    bits.add("name").unwrap();
    assert_eq!(bits.emit_declaration(), "let mut isset: u8 = 0;");
    assert_eq!(bits.emit_set_bit("name").unwrap(), "isset |= 1 << 0;");
    assert_eq!(
        bits.emit_absence_checks(|key| format!("return Err({:?});", key)),
        vec!["if (isset & (1 << 0)) == 0 {", "    return Err(\"name\");", "}"]
    );
}

#[test]
fn multiple_words() {
    let mut bits = BitsetTracker::new("isset", WordWidth::W8);
    for i in 0..10 {
        bits.add(&format!("f{}", i)).unwrap();
    }
    assert_eq!(bits.word_count(), 2);
    assert_eq!(bits.emit_declaration(), "let mut isset: [u8; 2] = [0; 2];");
    assert_eq!(bits.emit_set_bit("f9").unwrap(), "isset[1] |= 1 << 1;");

    let checks = bits.emit_absence_checks(|_| "missing();".to_string());
    // Eight tracked bits in the first word: dense, so guarded.
    assert_eq!(checks[0], "if isset[0] != 0xff {");
    assert_eq!(checks[1], "    if (isset[0] & (1 << 0)) == 0 {");
    // Two of eight in the second: tested directly.
    let second = checks.iter().position(|l| l.starts_with("if (isset[1]")).unwrap();
    assert_eq!(checks[second], "if (isset[1] & (1 << 0)) == 0 {");
    assert_eq!(checks.last().map(String::as_str), Some("}"));
}

#[test]
fn partial_dense_word_masks_tracked_bits_only() {
    let mut bits = BitsetTracker::new("isset", WordWidth::W8);
    for key in ["a", "b", "c", "d", "e"] {
        bits.add(key).unwrap();
    }
    let checks = bits.emit_absence_checks(|_| String::new());
    assert_eq!(checks[0], "if isset != 0x1f {");
}

#[test]
fn nothing_tracked() {
    let bits = BitsetTracker::new("isset", WordWidth::W64);
    assert!(bits.is_empty());
    assert_eq!(bits.emit_declaration(), "");
    assert!(bits.emit_absence_checks(|_| String::new()).is_empty());
}
