//! Fuzz target for PathSet algebra and priority resolution.
//!
//! Tests algebraic properties:
//! - Commutativity and associativity of `|`, `&`, `^`
//! - Distributivity: a & (b | c) == (a & b) | (a & c)
//! - Complement laws
//! - `most_significant` returns the top member and nothing else

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use paths::PathSet;

#[derive(Arbitrary, Debug)]
struct Input {
  a: u8,
  b: u8,
  c: u8,
}

fuzz_target!(|input: Input| {
  let a = PathSet::from_bits(input.a);
  let b = PathSet::from_bits(input.b);
  let c = PathSet::from_bits(input.c);

  // ─── Commutativity ───
  assert_eq!(a | b, b | a, "union must be commutative");
  assert_eq!(a & b, b & a, "intersection must be commutative");
  assert_eq!(a ^ b, b ^ a, "symmetric difference must be commutative");

  // ─── Associativity ───
  assert_eq!((a | b) | c, a | (b | c), "union must be associative");
  assert_eq!((a & b) & c, a & (b & c), "intersection must be associative");
  assert_eq!((a ^ b) ^ c, a ^ (b ^ c), "symmetric difference must be associative");

  // ─── Distributivity ───
  assert_eq!(a & (b | c), (a & b) | (a & c), "intersection must distribute over union");

  // ─── Complement ───
  assert_eq!(a & !a, PathSet::NONE, "a set and its complement are disjoint");
  assert_eq!((a | !a).bits(), u8::MAX, "a set and its complement cover every bit");
  assert_eq!((a | b) & !a, b & !a, "union minus left operand");

  // ─── Priority resolution ───
  let top = (a | b).most_significant();
  if (a | b).is_empty() {
    assert_eq!(top, PathSet::NONE, "empty set resolves to NONE");
  } else {
    assert!(top.is_single(), "resolution must yield one path");
    assert!((a | b).contains(top), "resolution must pick a member");
    assert_eq!(
      top.most_significant(),
      a.most_significant().max_by_bits(b.most_significant()),
      "top of a union is the larger of the operands' tops"
    );
  }
});

trait MaxByBits {
  fn max_by_bits(self, other: Self) -> Self;
}

impl MaxByBits for PathSet {
  fn max_by_bits(self, other: Self) -> Self {
    if self.bits() >= other.bits() { self } else { other }
  }
}
