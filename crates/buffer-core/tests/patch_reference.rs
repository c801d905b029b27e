//! Randomized validation of `Patch` against real text.
//!
//! Random edits are applied to a `ropey::Rope` and recorded in a patch with their texts. The
//! patch must then reproduce the edited document from the original one, and every derived
//! patch (inverted, composed, decoded) must do the same for its own pair of documents.

use buffer_core::{Change, Patch, PatchOptions, Point, Text};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ropey::Rope;

fn point_at(rope: &Rope, char_idx: usize) -> Point {
    let row = rope.char_to_line(char_idx);
    let column = char_idx - rope.line_to_char(row);
    Point::new(row as u32, column as u32)
}

fn offset_of(rope: &Rope, point: Point) -> usize {
    rope.line_to_char(point.row as usize) + point.column as usize
}

fn random_text(rng: &mut StdRng) -> String {
    let len = rng.gen_range(0..5);
    (0..len)
        .map(|_| match rng.gen_range(0..8) {
            0 => '\n',
            n => (b'a' + n as u8) as char,
        })
        .collect()
}

/// Replace each change's old region of `base` with its new text.
fn apply(changes: &[Change], base: &str) -> String {
    let mut rope = Rope::from_str(base);
    for change in changes.iter().rev() {
        let start = offset_of(&rope, change.old_start);
        let end = offset_of(&rope, change.old_end);
        let new_text = change
            .new_text
            .as_ref()
            .expect("every change records its new text")
            .to_string_lossy();
        rope.remove(start..end);
        rope.insert(start, &new_text);
    }
    rope.to_string()
}

/// Make `edits` random edits to `document`, returning the edited text and the patch recording
/// them.
fn random_edits(
    rng: &mut StdRng,
    document: &str,
    edits: usize,
    options: PatchOptions,
) -> (String, Patch) {
    let mut rope = Rope::from_str(document);
    let mut patch = Patch::with_options(options);
    for _ in 0..edits {
        let len = rope.len_chars();
        let start = rng.gen_range(0..=len);
        let end = (start + rng.gen_range(0..4)).min(len);
        let deleted = rope.slice(start..end).to_string();
        let inserted = random_text(rng);

        let deleted = Text::from(deleted.as_str());
        let inserted_text = Text::from(inserted.as_str());
        patch
            .splice(
                point_at(&rope, start),
                deleted.extent(),
                inserted_text.extent(),
                Some(deleted),
                Some(inserted_text),
            )
            .unwrap();

        rope.remove(start..end);
        rope.insert(start, &inserted);
    }
    (rope.to_string(), patch)
}

fn check_texts(changes: &[Change], old: &str, new: &str) {
    let old = Rope::from_str(old);
    let new = Rope::from_str(new);
    for change in changes {
        let old_slice = old
            .slice(offset_of(&old, change.old_start)..offset_of(&old, change.old_end))
            .to_string();
        let new_slice = new
            .slice(offset_of(&new, change.new_start)..offset_of(&new, change.new_end))
            .to_string();
        assert_eq!(change.old_text.as_ref().map(Text::to_string_lossy), Some(old_slice));
        assert_eq!(change.new_text.as_ref().map(Text::to_string_lossy), Some(new_slice));
    }
}

fn check_ordering(changes: &[Change]) {
    for pair in changes.windows(2) {
        assert!(pair[0].old_end <= pair[1].old_start);
        assert!(pair[0].new_end <= pair[1].new_start);
    }
}

const DOCUMENT: &str = "fn main() {\n    let x = 1;\n    println!(\"{x}\");\n}\n";

#[test]
fn test_patch_reproduces_random_edits() {
    for seed in 0..50 {
        for merges_adjacent_changes in [true, false] {
            let mut rng = StdRng::seed_from_u64(seed);
            let options = PatchOptions {
                merges_adjacent_changes,
            };
            let (edited, patch) = random_edits(&mut rng, DOCUMENT, 20, options);
            let changes = patch.get_changes();
            check_ordering(&changes);
            check_texts(&changes, DOCUMENT, &edited);
            assert_eq!(apply(&changes, DOCUMENT), edited, "seed {seed}");
        }
    }
}

#[test]
fn test_inverted_patch_restores_original() {
    for seed in 0..30 {
        let mut rng = StdRng::seed_from_u64(seed);
        let (edited, patch) = random_edits(&mut rng, DOCUMENT, 15, PatchOptions::default());
        let inverted = patch.invert();
        assert_eq!(apply(&inverted.get_changes(), &edited), DOCUMENT);
        assert_eq!(inverted.invert().get_changes(), patch.get_changes());
    }
}

#[test]
fn test_composed_patches_chain_documents() {
    for seed in 0..30 {
        let mut rng = StdRng::seed_from_u64(seed);
        let (first, p1) = random_edits(&mut rng, DOCUMENT, 8, PatchOptions::default());
        let (second, p2) = random_edits(&mut rng, &first, 8, PatchOptions::default());
        let (third, p3) = random_edits(&mut rng, &second, 8, PatchOptions::default());

        let composed = Patch::compose(&[p1.clone(), p2.clone(), p3.clone()]).unwrap();
        let changes = composed.get_changes();
        check_ordering(&changes);
        check_texts(&changes, DOCUMENT, &third);
        assert_eq!(apply(&changes, DOCUMENT), third, "seed {seed}");

        let mut stepwise = Patch::compose(&[p1, p2]).unwrap();
        stepwise.combine(&p3, true).unwrap();
        assert_eq!(stepwise.get_changes(), changes);
    }
}

#[test]
fn test_serialized_patch_round_trips() {
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let (edited, patch) = random_edits(&mut rng, DOCUMENT, 25, PatchOptions::default());
        let decoded = Patch::deserialize(&patch.serialize()).unwrap();
        assert_eq!(decoded.get_changes(), patch.get_changes());
        assert_eq!(apply(&decoded.get_changes(), DOCUMENT), edited);
    }
}

#[test]
fn test_rebalance_preserves_changes() {
    let mut rng = StdRng::seed_from_u64(7);
    let options = PatchOptions {
        merges_adjacent_changes: false,
    };
    let (_, mut patch) = random_edits(&mut rng, DOCUMENT, 60, options);
    let before = patch.get_changes();
    patch.rebalance();
    assert_eq!(patch.get_changes(), before);
    let balanced_depth = (usize::BITS - before.len().leading_zeros()) as usize;
    assert!(patch.depth() <= balanced_depth.max(1));
}

/// Where a change recorded before an old-space edit should end up after it.
enum Fate {
    Kept(Change),
    Shifted(Change),
    Dropped,
}

fn fate(change: &Change, old_start: Point, deletion_end: Point, insertion_end: Point) -> Fate {
    if change.old_end <= old_start {
        Fate::Kept(change.clone())
    } else if change.old_start >= deletion_end && change.old_start > old_start {
        let shift = |point: Point| insertion_end.traverse(point.traversal(deletion_end));
        Fate::Shifted(Change {
            old_start: shift(change.old_start),
            old_end: shift(change.old_end),
            ..change.clone()
        })
    } else {
        Fate::Dropped
    }
}

#[test]
fn test_splice_old_moves_changes_outside_the_edit() {
    for seed in 0..40 {
        for merges_adjacent_changes in [true, false] {
            let mut rng = StdRng::seed_from_u64(seed);
            let options = PatchOptions {
                merges_adjacent_changes,
            };
            let (_, mut patch) = random_edits(&mut rng, DOCUMENT, 12, options);
            let before = patch.get_changes();

            let old = Rope::from_str(DOCUMENT);
            let a = rng.gen_range(0..=old.len_chars());
            let b = (a + rng.gen_range(0..6)).min(old.len_chars());
            let old_start = point_at(&old, a);
            let deletion_end = point_at(&old, b);
            let inserted = Text::from(random_text(&mut rng).as_str());
            let insertion_end = old_start.traverse(inserted.extent());

            patch.splice_old(old_start, deletion_end.traversal(old_start), inserted.extent());
            let after = patch.get_changes();
            check_ordering(&after);

            let expected: Vec<Fate> = before
                .iter()
                .map(|change| fate(change, old_start, deletion_end, insertion_end))
                .collect();
            let kept: Vec<&Change> = expected
                .iter()
                .filter_map(|fate| match fate {
                    Fate::Kept(change) => Some(change),
                    _ => None,
                })
                .collect();
            let shifted: Vec<&Change> = expected
                .iter()
                .filter_map(|fate| match fate {
                    Fate::Shifted(change) => Some(change),
                    _ => None,
                })
                .collect();

            let joined = kept.len() + shifted.len() - after.len();
            if merges_adjacent_changes {
                assert!(joined <= 1, "seed {seed}");
            } else {
                assert_eq!(joined, 0, "seed {seed}");
            }
            if joined == 1 {
                let (last, first) = (kept[kept.len() - 1], shifted[0]);
                assert_eq!(last.old_end, first.old_start, "seed {seed}");
            }

            // Everything before the edit is untouched.
            let untouched = kept.len() - joined;
            for (actual, expected) in after.iter().zip(&kept[..untouched]) {
                assert_eq!(actual, *expected, "seed {seed}");
            }

            // Everything after it keeps its texts and extents and moves with the edit in old
            // space.
            for (actual, expected) in after.iter().rev().zip(shifted.iter().skip(joined).rev()) {
                assert_eq!(actual.old_start, expected.old_start, "seed {seed}");
                assert_eq!(actual.old_end, expected.old_end, "seed {seed}");
                assert_eq!(
                    actual.new_end.traversal(actual.new_start),
                    expected.new_end.traversal(expected.new_start),
                    "seed {seed}"
                );
                assert_eq!(actual.old_text, expected.old_text, "seed {seed}");
                assert_eq!(actual.new_text, expected.new_text, "seed {seed}");
            }
        }
    }
}

#[test]
fn test_range_queries_match_linear_scan() {
    let mut rng = StdRng::seed_from_u64(11);
    let (edited, patch) = random_edits(&mut rng, DOCUMENT, 30, PatchOptions::default());
    let changes = patch.get_changes();
    let old = Rope::from_str(DOCUMENT);
    let new = Rope::from_str(&edited);

    for _ in 0..100 {
        let a = rng.gen_range(0..=old.len_chars());
        let b = rng.gen_range(a..=old.len_chars());
        let (start, end) = (point_at(&old, a), point_at(&old, b));
        let expected: Vec<Change> = changes
            .iter()
            .filter(|change| change.old_end > start && change.old_start < end)
            .cloned()
            .collect();
        assert_eq!(patch.grab_changes_in_old_range(start, end), expected);

        let expected = changes
            .iter()
            .rev()
            .find(|change| change.old_start <= start)
            .cloned();
        assert_eq!(patch.grab_change_starting_before_old_position(start), expected);

        let position = point_at(&new, rng.gen_range(0..=new.len_chars()));
        let expected = changes
            .iter()
            .rev()
            .find(|change| change.new_start <= position)
            .cloned();
        assert_eq!(patch.grab_change_starting_before_new_position(position), expected);
    }
}
