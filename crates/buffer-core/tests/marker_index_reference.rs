//! Randomized validation of `MarkerIndex` against a brute-force model.
//!
//! The model keeps every marker in a plain map and answers each query by scanning all of
//! them. Each run uses a fixed seed so failures are reproducible.

use buffer_core::{Exclusivity, MarkerId, MarkerIndex, Point, Range, SpliceResult};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Default)]
struct Model {
    markers: HashMap<MarkerId, (Range, Exclusivity)>,
}

fn shift(
    point: Point,
    start: Point,
    old_end: Point,
    new_end: Point,
    moves_at_start: bool,
) -> Point {
    if point < start {
        point
    } else if point == start {
        if moves_at_start { new_end } else { start }
    } else if point < old_end {
        new_end
    } else {
        new_end.traverse(point.traversal(old_end))
    }
}

impl Model {
    fn splice(&mut self, start: Point, old_extent: Point, new_extent: Point) -> SpliceResult {
        let mut result = SpliceResult::default();
        if self.markers.is_empty() || (old_extent.is_zero() && new_extent.is_zero()) {
            return result;
        }
        let old_end = start.traverse(old_extent);
        let new_end = start.traverse(new_extent);

        for (&id, (range, exclusivity)) in self.markers.iter_mut() {
            let touched = range.start <= old_end && range.end >= start;
            let start_moved = range.start == start && exclusivity.start;
            let new_start = shift(range.start, start, old_end, new_end, exclusivity.start);
            let end_moves = (old_extent.is_zero() && exclusivity.end) || start_moved;
            let new_finish = shift(range.end, start, old_end, new_end, end_moves);

            if touched {
                let inside = start < old_end && start <= range.start && range.end <= old_end;
                let surround = range.start <= start
                    && old_end <= range.end
                    && new_start <= start
                    && new_end <= new_finish;
                let overlap = range.start < old_end && start < range.end && !inside && !surround;
                result.touch.insert(id);
                if inside {
                    result.inside.insert(id);
                }
                if surround {
                    result.surround.insert(id);
                }
                if overlap {
                    result.overlap.insert(id);
                }
            }
            *range = Range {
                start: new_start,
                end: new_finish,
            };
        }
        result
    }

    fn matching(&self, predicate: impl Fn(&Range) -> bool) -> HashSet<MarkerId> {
        self.markers
            .iter()
            .filter(|(_, (range, _))| predicate(range))
            .map(|(&id, _)| id)
            .collect()
    }

    fn dump(&self) -> HashMap<MarkerId, Range> {
        self.markers
            .iter()
            .map(|(&id, (range, _))| (id, *range))
            .collect()
    }

    fn boundaries_after(
        &self,
        start: Point,
        max_count: usize,
    ) -> Vec<(Point, HashSet<MarkerId>, HashSet<MarkerId>)> {
        let mut by_position: BTreeMap<Point, (HashSet<MarkerId>, HashSet<MarkerId>)> =
            BTreeMap::new();
        for (&id, (range, _)) in &self.markers {
            if range.start >= start {
                by_position.entry(range.start).or_default().0.insert(id);
            }
            if range.end >= start {
                by_position.entry(range.end).or_default().1.insert(id);
            }
        }
        by_position
            .into_iter()
            .take(max_count)
            .map(|(position, (starting, ending))| (position, starting, ending))
            .collect()
    }
}

fn random_point(rng: &mut StdRng) -> Point {
    Point::new(rng.gen_range(0..6), rng.gen_range(0..12))
}

fn random_extent(rng: &mut StdRng) -> Point {
    if rng.gen_bool(0.6) {
        Point::new(0, rng.gen_range(0..5))
    } else {
        Point::new(rng.gen_range(0..3), rng.gen_range(0..5))
    }
}

fn ordered(a: Point, b: Point) -> (Point, Point) {
    if a <= b { (a, b) } else { (b, a) }
}

fn check_queries(index: &MarkerIndex, model: &Model, rng: &mut StdRng) {
    assert_eq!(index.dump(), model.dump());
    assert_eq!(index.len(), model.markers.len());

    for _ in 0..5 {
        let (start, end) = ordered(random_point(rng), random_point(rng));
        assert_eq!(
            index.find_intersecting(start, end),
            model.matching(|range| range.start <= end && range.end >= start)
        );
        assert_eq!(
            index.find_containing(start, end),
            model.matching(|range| range.start <= start && range.end >= end)
        );
        assert_eq!(
            index.find_contained_in(start, end),
            model.matching(|range| range.start >= start && range.end <= end)
        );
        assert_eq!(
            index.find_starting_in(start, end),
            model.matching(|range| range.start >= start && range.start <= end)
        );
        assert_eq!(
            index.find_ending_in(start, end),
            model.matching(|range| range.end >= start && range.end <= end)
        );

        let query = index.find_boundaries_after(start, 4);
        let boundaries: Vec<_> = query
            .boundaries
            .into_iter()
            .map(|boundary| (boundary.position, boundary.starting, boundary.ending))
            .collect();
        assert_eq!(boundaries, model.boundaries_after(start, 4));
        assert_eq!(
            query.containing_start.iter().copied().collect::<HashSet<_>>(),
            model.matching(|range| range.start < start && range.end >= start)
        );
    }
}

fn run(seed: u64, operations: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut index = MarkerIndex::with_seed(seed);
    let mut model = Model::default();
    let mut next_id: MarkerId = 0;

    for _ in 0..operations {
        match rng.gen_range(0..10) {
            0..=3 => {
                let (start, end) = ordered(random_point(&mut rng), random_point(&mut rng));
                index.insert(next_id, start, end).unwrap();
                let exclusivity = Exclusivity {
                    start: rng.gen_bool(0.3),
                    end: rng.gen_bool(0.3),
                };
                index.set_exclusivity(next_id, exclusivity);
                model
                    .markers
                    .insert(next_id, (Range { start, end }, exclusivity));
                next_id += 1;
            }
            4 if next_id > 0 => {
                let id = rng.gen_range(0..next_id);
                assert_eq!(index.remove(id), model.markers.remove(&id).is_some());
            }
            _ => {
                let start = random_point(&mut rng);
                let old_extent = random_extent(&mut rng);
                let new_extent = random_extent(&mut rng);
                let actual = index.splice(start, old_extent, new_extent);
                let expected = model.splice(start, old_extent, new_extent);
                assert_eq!(actual, expected, "splice at {start} ({old_extent} -> {new_extent})");
            }
        }
        check_queries(&index, &model, &mut rng);
    }
}

#[test]
fn test_random_operations_match_model() {
    for seed in 0..20 {
        run(seed, 200);
    }
}

#[test]
fn test_dense_markers_on_one_row() {
    let mut index = MarkerIndex::with_seed(99);
    let mut model = Model::default();
    let mut rng = StdRng::seed_from_u64(99);
    for id in 0..100 {
        let (start, end) = ordered(
            Point::new(0, rng.gen_range(0..20)),
            Point::new(0, rng.gen_range(0..20)),
        );
        index.insert(id, start, end).unwrap();
        model.markers.insert(id, (Range { start, end }, Exclusivity::default()));
    }
    for _ in 0..100 {
        let start = Point::new(0, rng.gen_range(0..25));
        let old_extent = Point::new(0, rng.gen_range(0..4));
        let new_extent = Point::new(0, rng.gen_range(0..4));
        assert_eq!(
            index.splice(start, old_extent, new_extent),
            model.splice(start, old_extent, new_extent)
        );
        assert_eq!(index.dump(), model.dump());
    }
}
