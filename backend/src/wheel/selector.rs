use rand::rngs::OsRng;
use rand::Rng;

use shared::wheel::Segment;

/// Picks a segment index with probability proportional to its weight.
/// Negative weights count as zero; if every weight is zero the first
/// segment wins by definition. The draw is an OS-sourced integer in
/// `[0, total)`, so the distribution is exact, never float-scaled.
pub fn pick_weighted_index(segments: &[Segment]) -> usize {
    let total = total_weight(segments);
    if total == 0 {
        return 0;
    }
    let mut rng = OsRng;
    let draw = rng.gen_range(0..total);
    index_for_draw(segments, draw)
}

fn total_weight(segments: &[Segment]) -> u64 {
    segments.iter().map(|s| s.weight.max(0) as u64).sum()
}

/// Walks cumulative weights until the draw falls inside a segment's range.
fn index_for_draw(segments: &[Segment], draw: u64) -> usize {
    let mut acc = 0u64;
    for (i, segment) in segments.iter().enumerate() {
        acc += segment.weight.max(0) as u64;
        if draw < acc {
            return i;
        }
    }
    // only reachable if draw >= total, which gen_range rules out
    segments.len().saturating_sub(1)
}
