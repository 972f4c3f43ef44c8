use super::{Annotation, Item, Transaction};
use similar::{capture_diff_slices, Algorithm, DiffOp};

/// Describe how to get from `old` to `new` as a single transaction.
///
/// When `paste_prefix` is set, every inserted character is annotated as
/// pasted content, one paste id per contiguous insertion
/// (`{prefix}-1`, `{prefix}-2`, ...).
pub fn transaction(old: &[Item], new: &[Item], paste_prefix: Option<&str>) -> Transaction {
    let mut tx = Transaction::new();
    let mut pastes = 0;

    for op in capture_diff_slices(Algorithm::Myers, old, new) {
        match op {
            DiffOp::Equal { len, .. } => tx.retain(len),
            DiffOp::Delete {
                old_index, old_len, ..
            } => tx.replace(old[old_index..old_index + old_len].to_vec(), Vec::new()),
            DiffOp::Insert {
                new_index, new_len, ..
            } => {
                let inserted = &new[new_index..new_index + new_len];
                tx.replace(Vec::new(), annotate(inserted, paste_prefix, &mut pastes));
            }
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                let inserted = &new[new_index..new_index + new_len];
                tx.replace(
                    old[old_index..old_index + old_len].to_vec(),
                    annotate(inserted, paste_prefix, &mut pastes),
                );
            }
        }
    }

    tx
}

fn annotate(items: &[Item], paste_prefix: Option<&str>, pastes: &mut usize) -> Vec<Item> {
    let Some(prefix) = paste_prefix else {
        return items.to_vec();
    };
    *pastes += 1;
    let annotation = Annotation::pasted(format!("{prefix}-{pastes}"));
    items
        .iter()
        .map(|item| match item {
            Item::Char { ch, .. } => Item::Char {
                ch: *ch,
                annotation: Some(annotation.clone()),
            },
            other => other.clone(),
        })
        .collect()
}
