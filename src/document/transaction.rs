use super::{DocumentError, Item, Range};
use std::collections::VecDeque;

/// How an offset sitting exactly on an insertion boundary is mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    /// Stay before content inserted at the offset.
    Left,
    /// Move past content inserted at the offset.
    Right,
}

/// A single step of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Keep the next `n` items unchanged.
    Retain(usize),
    /// Swap `remove` (taken from the source document) for `insert`.
    Replace { remove: Vec<Item>, insert: Vec<Item> },
}

/// One committed edit: an ordered sequence of operations spanning the whole
/// document it was built against.
///
/// Consecutive retains are merged, as are consecutive replacements, so a
/// transaction never holds two adjacent operations of the same kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transaction {
    ops: Vec<Operation>,
    len_before: usize,
    len_after: usize,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `items` at `offset` of a document holding `doc_len` items.
    pub fn insertion(doc_len: usize, offset: usize, items: Vec<Item>) -> Self {
        let mut tx = Self::new();
        tx.retain(offset);
        tx.replace(Vec::new(), items);
        tx.retain(doc_len.saturating_sub(offset));
        tx
    }

    /// Replace `items[start..end]` with `insert`.
    pub fn replacement(items: &[Item], start: usize, end: usize, insert: Vec<Item>) -> Result<Self, DocumentError> {
        let removed = items.get(start..end).ok_or(DocumentError::OutOfBounds {
            range: Range::new(start, end),
            len: items.len(),
        })?;
        let mut tx = Self::new();
        tx.retain(start);
        tx.replace(removed.to_vec(), insert);
        tx.retain(items.len() - end);
        Ok(tx)
    }

    pub fn retain(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        self.len_before += n;
        self.len_after += n;
        if let Some(Operation::Retain(count)) = self.ops.last_mut() {
            *count += n;
        } else {
            self.ops.push(Operation::Retain(n));
        }
    }

    pub fn replace(&mut self, remove: Vec<Item>, insert: Vec<Item>) {
        if remove.is_empty() && insert.is_empty() {
            return;
        }
        self.len_before += remove.len();
        self.len_after += insert.len();
        if let Some(Operation::Replace {
            remove: prev_remove,
            insert: prev_insert,
        }) = self.ops.last_mut()
        {
            prev_remove.extend(remove);
            prev_insert.extend(insert);
        } else {
            self.ops.push(Operation::Replace { remove, insert });
        }
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn len_before(&self) -> usize {
        self.len_before
    }

    pub fn len_after(&self) -> usize {
        self.len_after
    }

    /// True when the transaction only retains.
    pub fn is_noop(&self) -> bool {
        self.ops
            .iter()
            .all(|op| matches!(op, Operation::Retain(_)))
    }

    /// Apply to `items`, checking that the transaction was built against them.
    ///
    /// On error `items` is left untouched.
    pub fn apply(&self, items: &mut Vec<Item>) -> Result<(), DocumentError> {
        if self.len_before != items.len() {
            return Err(DocumentError::LengthMismatch {
                expected: self.len_before,
                actual: items.len(),
            });
        }

        let mut out = Vec::with_capacity(self.len_after);
        let mut pos = 0;
        for op in &self.ops {
            match op {
                Operation::Retain(n) => {
                    out.extend_from_slice(&items[pos..pos + n]);
                    pos += n;
                }
                Operation::Replace { remove, insert } => {
                    if items[pos..pos + remove.len()] != remove[..] {
                        return Err(DocumentError::RemovedMismatch { offset: pos });
                    }
                    out.extend(insert.iter().cloned());
                    pos += remove.len();
                }
            }
        }

        *items = out;
        Ok(())
    }

    /// Map an offset in the source document to the resulting document.
    ///
    /// Offsets inside removed content, or on the boundary of an insertion,
    /// land on the start (`Left`) or end (`Right`) of the replacement.
    pub fn map_offset(&self, pos: usize, bias: Bias) -> usize {
        let mut old_pos = 0;
        let mut new_pos = 0;

        for op in &self.ops {
            match op {
                Operation::Retain(n) => {
                    if pos < old_pos + n {
                        return new_pos + (pos - old_pos);
                    }
                    old_pos += n;
                    new_pos += n;
                }
                Operation::Replace { remove, insert } => {
                    let removed = remove.len();
                    let touched = if removed == 0 {
                        pos == old_pos
                    } else {
                        pos >= old_pos && pos < old_pos + removed
                    };
                    if touched {
                        return match bias {
                            Bias::Left => new_pos,
                            Bias::Right => new_pos + insert.len(),
                        };
                    }
                    old_pos += removed;
                    new_pos += insert.len();
                }
            }
        }

        new_pos + pos.saturating_sub(old_pos)
    }

    /// Compose `self` then `other` into a single equivalent transaction.
    pub fn compose(self, other: Transaction) -> Result<Transaction, DocumentError> {
        if self.len_after != other.len_before {
            return Err(DocumentError::Squash {
                left: self.len_after,
                right: other.len_before,
            });
        }

        let mut a = Atom::split_all(self.ops);
        let mut b = Atom::split_all(other.ops);
        let mut result = Transaction::new();

        loop {
            match (a.front(), b.front()) {
                (None, None) => break,
                (Some(Atom::Delete(_)), _) => {
                    if let Some(Atom::Delete(items)) = a.pop_front() {
                        result.replace(items, Vec::new());
                    }
                }
                (_, Some(Atom::Insert(_))) => {
                    if let Some(Atom::Insert(items)) = b.pop_front() {
                        result.replace(Vec::new(), items);
                    }
                }
                (Some(left), Some(right)) => {
                    let n = left.len().min(right.len());
                    let left = Atom::take(&mut a, n);
                    let right = Atom::take(&mut b, n);
                    match (left, right) {
                        (Atom::Retain(_), Atom::Retain(_)) => result.retain(n),
                        (Atom::Retain(_), Atom::Delete(items)) => {
                            result.replace(items, Vec::new())
                        }
                        (Atom::Insert(items), Atom::Retain(_)) => {
                            result.replace(Vec::new(), items)
                        }
                        // Inserted by the first, removed by the second.
                        (Atom::Insert(_), Atom::Delete(_)) => {}
                        _ => unreachable!("deletes and inserts are drained first"),
                    }
                }
                _ => {
                    return Err(DocumentError::Squash {
                        left: result.len_after,
                        right: result.len_before,
                    })
                }
            }
        }

        Ok(result)
    }
}

/// Flat view of operations used while composing.
#[derive(Debug)]
enum Atom {
    Retain(usize),
    Delete(Vec<Item>),
    Insert(Vec<Item>),
}

impl Atom {
    fn split_all(ops: Vec<Operation>) -> VecDeque<Atom> {
        let mut atoms = VecDeque::new();
        for op in ops {
            match op {
                Operation::Retain(n) => atoms.push_back(Atom::Retain(n)),
                Operation::Replace { remove, insert } => {
                    if !remove.is_empty() {
                        atoms.push_back(Atom::Delete(remove));
                    }
                    if !insert.is_empty() {
                        atoms.push_back(Atom::Insert(insert));
                    }
                }
            }
        }
        atoms
    }

    fn len(&self) -> usize {
        match self {
            Atom::Retain(n) => *n,
            Atom::Delete(items) | Atom::Insert(items) => items.len(),
        }
    }

    /// Split the first `n` positions off the front atom of `atoms`.
    fn take(atoms: &mut VecDeque<Atom>, n: usize) -> Atom {
        let front = atoms.pop_front().expect("caller checked the queue is not empty");
        if front.len() == n {
            return front;
        }
        let (head, rest) = match front {
            Atom::Retain(len) => (Atom::Retain(n), Atom::Retain(len - n)),
            Atom::Delete(mut items) => {
                let rest = items.split_off(n);
                (Atom::Delete(items), Atom::Delete(rest))
            }
            Atom::Insert(mut items) => {
                let rest = items.split_off(n);
                (Atom::Insert(items), Atom::Insert(rest))
            }
        };
        atoms.push_front(rest);
        head
    }
}
