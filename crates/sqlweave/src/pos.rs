//! Clause ordering keys.

/// Position of a chunk in canonical SQL clause order.
///
/// Built-in clauses sit [`Pos::SPACING`] apart so that bracket chunks
/// (`INSERT INTO t ( ... ) VALUES ( ... )`) and custom clauses can be slotted
/// between them without renumbering anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos(u32);

impl Pos {
    /// Distance between two consecutive built-in clauses.
    pub const SPACING: u32 = 1000;
    /// Distance between consecutive custom clauses opened by `Stmt::clause`.
    pub const CLAUSE_STEP: u32 = 10;

    pub const START: Pos = Pos::nth(1);
    pub const WITH: Pos = Pos::nth(2);
    pub const INSERT: Pos = Pos::nth(3);
    pub const INSERT_FIELDS: Pos = Pos::nth(4);
    pub const VALUES: Pos = Pos::nth(5);
    pub const DELETE: Pos = Pos::nth(6);
    pub const UPDATE: Pos = Pos::nth(7);
    pub const SET: Pos = Pos::nth(8);
    pub const SELECT: Pos = Pos::nth(9);
    pub const INTO: Pos = Pos::nth(10);
    pub const FROM: Pos = Pos::nth(11);
    pub const WHERE: Pos = Pos::nth(12);
    pub const GROUP_BY: Pos = Pos::nth(13);
    pub const HAVING: Pos = Pos::nth(14);
    pub const UNION: Pos = Pos::nth(15);
    pub const ORDER_BY: Pos = Pos::nth(16);
    pub const LIMIT: Pos = Pos::nth(17);
    pub const OFFSET: Pos = Pos::nth(18);
    pub const RETURNING: Pos = Pos::nth(19);
    /// Start of the open-ended custom clause range.
    pub const END: Pos = Pos::nth(20);

    const fn nth(n: u32) -> Pos {
        Pos(n * Self::SPACING)
    }

    /// Build a position from a raw key.
    pub const fn new(raw: u32) -> Pos {
        Pos(raw)
    }

    /// Raw ordering key.
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The position immediately before this one, saturating at zero.
    pub const fn before(self) -> Pos {
        Pos(self.0.saturating_sub(1))
    }

    /// The position immediately after this one, saturating at the top of the range.
    pub const fn after(self) -> Pos {
        Pos(self.0.saturating_add(1))
    }

    /// The position `n` steps after this one, saturating at the top of the range.
    pub const fn offset(self, n: u32) -> Pos {
        Pos(self.0.saturating_add(n))
    }
}
