//! Chunk sequence and fragment buffer.
//!
//! Every fragment of a statement is appended to one growable text buffer and
//! never moved afterwards. A [`Chunk`] records which slice of that buffer it
//! owns and where it belongs in clause order; the chunk list is kept sorted
//! by [`Pos`], so rendering is a left-to-right walk regardless of the order
//! fragments were added in.

use crate::pos::Pos;

/// A span of fragment text tagged with its clause position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Chunk {
    pub(crate) pos: Pos,
    pub(crate) low: usize,
    pub(crate) high: usize,
    /// `false` while the chunk holds nothing but its clause keyword.
    pub(crate) has_expr: bool,
    /// Number of arguments whose placeholders live in this span.
    pub(crate) arg_len: usize,
}

/// Result of a backward scan for a position.
struct Located {
    /// Where a new chunk for the position must be inserted.
    index: usize,
    /// Last chunk already holding the position, if any.
    same: Option<usize>,
    /// Total arguments of chunks rendering after the position.
    arg_tail: usize,
}

/// Sorted chunk list plus the append-only buffer the chunks point into.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChunkSeq {
    chunks: Vec<Chunk>,
    buf: String,
}

impl ChunkSeq {
    pub(crate) fn with_capacity(chunks: usize, bytes: usize) -> Self {
        Self {
            chunks: Vec::with_capacity(chunks),
            buf: String::with_capacity(bytes),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.chunks.len()
    }

    #[cfg(test)]
    pub(crate) fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Text of a chunk. The borrow ends before the next mutation.
    pub(crate) fn text(&self, chunk: &Chunk) -> &str {
        &self.buf[chunk.low..chunk.high]
    }

    pub(crate) fn last_pos(&self) -> Option<Pos> {
        self.chunks.last().map(|c| c.pos)
    }

    /// Whether any chunk sits exactly at `pos`.
    pub(crate) fn contains(&self, pos: Pos) -> bool {
        self.locate(pos).same.is_some()
    }

    /// Buffer capacity in bytes (for pool retention decisions).
    pub(crate) fn buffer_capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Number of bytes ever written for the current statement.
    #[cfg(test)]
    pub(crate) fn buffer_len(&self) -> usize {
        self.buf.len()
    }

    /// Forget every chunk while keeping both allocations.
    pub(crate) fn clear(&mut self) {
        self.chunks.clear();
        self.buf.clear();
    }

    /// Replace the contents with a copy of `other`, reusing our allocations.
    pub(crate) fn copy_from(&mut self, other: &ChunkSeq) {
        self.chunks.clear();
        self.chunks.extend_from_slice(&other.chunks);
        self.buf.clear();
        self.buf.push_str(&other.buf);
    }

    fn locate(&self, pos: Pos) -> Located {
        let mut arg_tail = 0;
        for (i, chunk) in self.chunks.iter().enumerate().rev() {
            if chunk.pos == pos {
                return Located {
                    index: i + 1,
                    same: Some(i),
                    arg_tail,
                };
            }
            if chunk.pos < pos {
                return Located {
                    index: i + 1,
                    same: None,
                    arg_tail,
                };
            }
            arg_tail += chunk.arg_len;
        }
        Located {
            index: 0,
            same: None,
            arg_tail,
        }
    }

    /// Append an expression made of `parts` at `pos`.
    ///
    /// If the last chunk at `pos` ends at the buffer's write head, it is
    /// extended in place (after `sep`, or a single space when it only holds a
    /// clause keyword). Otherwise a new chunk is inserted right after it, its
    /// span starting with that same separator so both render identically.
    ///
    /// Returns the number of arguments owned by chunks that render after
    /// `pos`; the caller inserts `arg_len` new arguments that many slots from
    /// the end of its argument list.
    pub(crate) fn add(&mut self, pos: Pos, parts: &[&str], arg_len: usize, sep: &str) -> usize {
        let empty = parts.iter().all(|p| p.is_empty());
        let at = self.locate(pos);
        if empty && arg_len == 0 {
            return at.arg_tail;
        }

        let low = self.buf.len();
        if let Some(i) = at.same {
            let chunk = &mut self.chunks[i];
            if !empty {
                self.buf.push_str(if chunk.has_expr { sep } else { " " });
            }
            if chunk.high == low {
                for part in parts {
                    self.buf.push_str(part);
                }
                chunk.high = self.buf.len();
                chunk.arg_len += arg_len;
                chunk.has_expr |= !empty;
                return at.arg_tail;
            }
        }

        for part in parts {
            self.buf.push_str(part);
        }
        self.chunks.insert(
            at.index,
            Chunk {
                pos,
                low,
                high: self.buf.len(),
                has_expr: true,
                arg_len,
            },
        );
        at.arg_tail
    }

    /// Open a clause at `pos` holding just `keyword`, unless one exists.
    ///
    /// Returns the argument tail (see [`ChunkSeq::add`]) when a chunk was
    /// inserted, `None` when the clause was already present.
    pub(crate) fn open_clause(&mut self, pos: Pos, keyword: &str, arg_len: usize) -> Option<usize> {
        let at = self.locate(pos);
        if at.same.is_some() {
            return None;
        }
        let low = self.buf.len();
        self.buf.push_str(keyword);
        self.chunks.insert(
            at.index,
            Chunk {
                pos,
                low,
                high: self.buf.len(),
                has_expr: false,
                arg_len,
            },
        );
        Some(at.arg_tail)
    }

    /// Walk the chunks in render order as `(needs_space, text, chunk)`.
    ///
    /// A space separates chunks whose position differs from the previous one;
    /// chunks sharing a position already carry their own separator.
    pub(crate) fn pieces(&self) -> impl Iterator<Item = (bool, &str, &Chunk)> + '_ {
        let mut prev: Option<Pos> = None;
        self.chunks.iter().map(move |chunk| {
            let space = matches!(prev, Some(p) if chunk.pos > p);
            prev = Some(chunk.pos);
            (space, self.text(chunk), chunk)
        })
    }

    /// Concatenate every chunk verbatim.
    pub(crate) fn write_raw(&self, out: &mut String) {
        for (space, text, _) in self.pieces() {
            if space {
                out.push(' ');
            }
            out.push_str(text);
        }
    }

    /// Like [`ChunkSeq::write_raw`], but every `?` of an argument-less chunk
    /// is written as `\?` so that it survives placeholder numbering.
    pub(crate) fn write_escaped(&self, out: &mut String) {
        for (space, text, chunk) in self.pieces() {
            if space {
                out.push(' ');
            }
            if chunk.arg_len > 0 {
                out.push_str(text);
                continue;
            }
            let mut rest = text;
            while let Some(i) = rest.find('?') {
                out.push_str(&rest[..i]);
                out.push_str("\\?");
                rest = &rest[i + 1..];
            }
            out.push_str(rest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(seq: &ChunkSeq) -> String {
        let mut out = String::new();
        seq.write_raw(&mut out);
        out
    }

    #[test]
    fn clauses_render_in_position_order() {
        let mut seq = ChunkSeq::default();
        seq.open_clause(Pos::WHERE, "WHERE", 0);
        seq.add(Pos::WHERE, &["a = 1"], 0, " AND ");
        seq.open_clause(Pos::SELECT, "SELECT", 0);
        seq.add(Pos::SELECT, &["id"], 0, ", ");
        seq.open_clause(Pos::FROM, "FROM", 0);
        seq.add(Pos::FROM, &["t"], 0, ", ");

        assert_eq!(raw(&seq), "SELECT id FROM t WHERE a = 1");
    }

    #[test]
    fn contiguous_expressions_merge_into_one_chunk() {
        let mut seq = ChunkSeq::default();
        seq.open_clause(Pos::SELECT, "SELECT", 0);
        seq.add(Pos::SELECT, &["a"], 0, ", ");
        seq.add(Pos::SELECT, &["b"], 0, ", ");

        assert_eq!(seq.len(), 1);
        assert_eq!(raw(&seq), "SELECT a, b");
        assert!(seq.chunks()[0].has_expr);
    }

    #[test]
    fn interleaved_expressions_fragment_but_render_the_same() {
        let mut seq = ChunkSeq::default();
        seq.open_clause(Pos::WHERE, "WHERE", 0);
        seq.add(Pos::WHERE, &["a = ?"], 1, " AND ");
        seq.open_clause(Pos::FROM, "FROM", 0);
        seq.add(Pos::FROM, &["t"], 0, ", ");
        seq.add(Pos::WHERE, &["b = ?"], 1, " AND ");

        // The FROM chunk was written after the first WHERE chunk, so the
        // second condition cannot extend it in place.
        let where_chunks = seq.chunks().iter().filter(|c| c.pos == Pos::WHERE).count();
        assert_eq!(where_chunks, 2);
        assert_eq!(raw(&seq), "FROM t WHERE a = ? AND b = ?");
    }

    #[test]
    fn argument_tail_counts_later_clauses_only() {
        let mut seq = ChunkSeq::default();
        assert_eq!(seq.add(Pos::LIMIT, &["LIMIT ?"], 1, " "), 0);
        assert_eq!(seq.add(Pos::OFFSET, &["OFFSET ?"], 1, " "), 0);
        assert_eq!(seq.add(Pos::WHERE, &["WHERE a = ?"], 1, " "), 2);
        assert_eq!(seq.add(Pos::LIMIT, &["x"], 0, ", "), 1);
        assert_eq!(seq.add(Pos::END, &["FOR UPDATE"], 0, " "), 0);
    }

    #[test]
    fn open_clause_keeps_first_keyword() {
        let mut seq = ChunkSeq::default();
        assert_eq!(seq.open_clause(Pos::LIMIT, "LIMIT ?", 1), Some(0));
        assert_eq!(seq.open_clause(Pos::LIMIT, "LIMIT ?", 1), None);
        assert_eq!(seq.len(), 1);
        assert!(!seq.chunks()[0].has_expr);
    }

    #[test]
    fn keyword_to_expression_uses_single_space() {
        let mut seq = ChunkSeq::default();
        seq.open_clause(Pos::WHERE, "WHERE", 0);
        seq.add(Pos::WHERE, &["a"], 0, " AND ");
        seq.add(Pos::WHERE, &["b"], 0, " AND ");
        assert_eq!(raw(&seq), "WHERE a AND b");
    }

    #[test]
    fn empty_expression_writes_nothing() {
        let mut seq = ChunkSeq::default();
        seq.open_clause(Pos::FROM, "FROM", 0);
        seq.add(Pos::FROM, &[""], 0, ", ");
        assert!(!seq.chunks()[0].has_expr);

        seq.add(Pos::FROM, &["(", "SELECT 1", ") t"], 0, ", ");
        assert_eq!(raw(&seq), "FROM (SELECT 1) t");
    }

    #[test]
    fn escaped_copy_protects_literal_marks_only() {
        let mut seq = ChunkSeq::default();
        seq.open_clause(Pos::SELECT, "SELECT", 0);
        seq.add(Pos::SELECT, &["data ? 'k'"], 0, ", ");
        seq.open_clause(Pos::WHERE, "WHERE", 0);
        seq.add(Pos::WHERE, &["id = ?"], 1, " AND ");

        let mut out = String::new();
        seq.write_escaped(&mut out);
        assert_eq!(out, "SELECT data \\? 'k' WHERE id = ?");
    }

    #[test]
    fn clear_keeps_allocations() {
        let mut seq = ChunkSeq::with_capacity(8, 256);
        seq.add(Pos::SELECT, &["SELECT 1"], 0, ", ");
        let cap = seq.buffer_capacity();
        seq.clear();
        assert!(seq.is_empty());
        assert_eq!(seq.buffer_len(), 0);
        assert_eq!(seq.buffer_capacity(), cap);
    }
}
