//! Edit-distance and alignment scoring (`spec.md` §4.E).
//!
//! Levenshtein distance is ported row-major from `sz_levenshtein_serial` /
//! `sz_levenshtein_weighted_serial` in
//! `examples/original_source/src/serial.c` — a two-row Wagner-Fischer
//! sweep with an early-exit bound. Needleman-Wunsch (global) and
//! Smith-Waterman (local) follow the affine-gap recurrence described by
//! `global_aligner`/`local_aligner` in
//! `examples/original_source/include/stringcuzilla/similarities.hpp`,
//! generalized from their single `gap_cost_` to independent gap-open and
//! gap-extend costs (Gotoh's algorithm). Both are computed over two
//! rolling rows rather than the original's rolling anti-diagonals: the
//! accumulated cell values are identical either way, and a row-major sweep
//! is the safer traversal to hand-verify without a compiler in the loop.
//! Between-pair parallelism (scoring many pairs) is the caller's
//! responsibility via [`crate::executor`], per `spec.md` §4.E.

use crate::error::{CoreError, CoreResult};
use crate::executor::Executor;
use crate::sequence::StringSequence;

/// Sentinel returned when a bound makes the true distance provably
/// unreachable (`spec.md` §8's overflow-risk / bound-exceeded convention).
pub const BOUND_EXCEEDED: usize = usize::MAX;

/// A 256x256 substitution cost matrix plus affine gap costs, or a single
/// match/mismatch/gap-open/gap-extend quadruple (`spec.md` §3's Cost
/// model). Each cost lies in `[-128, 127]`.
#[derive(Clone)]
pub enum CostModel {
    Uniform {
        match_score: i8,
        mismatch_score: i8,
        gap_open: i8,
        gap_extend: i8,
    },
    Lookup {
        substitutions: Box<[[i8; 256]; 256]>,
        gap_open: i8,
        gap_extend: i8,
    },
}

impl CostModel {
    /// Build a uniform cost model.
    pub fn uniform(match_score: i8, mismatch_score: i8, gap_open: i8, gap_extend: i8) -> Self {
        CostModel::Uniform { match_score, mismatch_score, gap_open, gap_extend }
    }

    /// Build a 256x256-lookup cost model from a row-major substitution matrix.
    pub fn lookup(substitutions: Box<[[i8; 256]; 256]>, gap_open: i8, gap_extend: i8) -> Self {
        CostModel::Lookup { substitutions, gap_open, gap_extend }
    }

    #[inline]
    fn substitute(&self, a: u8, b: u8) -> i64 {
        match self {
            CostModel::Uniform { match_score, mismatch_score, .. } => {
                if a == b { *match_score as i64 } else { *mismatch_score as i64 }
            }
            CostModel::Lookup { substitutions, .. } => substitutions[a as usize][b as usize] as i64,
        }
    }

    #[inline]
    fn substitute_rune(&self, a: u32, b: u32) -> i64 {
        match self {
            CostModel::Uniform { match_score, mismatch_score, .. } => {
                if a == b { *match_score as i64 } else { *mismatch_score as i64 }
            }
            CostModel::Lookup { substitutions, .. } => {
                // Lookup costs are defined over bytes; runes outside that
                // range fall back to the uniform mismatch convention of
                // "equal vs. not", matching the byte path's equality test.
                if a < 256 && b < 256 {
                    substitutions[a as usize][b as usize] as i64
                } else if a == b {
                    0
                } else {
                    -1
                }
            }
        }
    }

    #[inline]
    fn gap_open(&self) -> i64 {
        match self {
            CostModel::Uniform { gap_open, .. } | CostModel::Lookup { gap_open, .. } => *gap_open as i64,
        }
    }

    #[inline]
    fn gap_extend(&self) -> i64 {
        match self {
            CostModel::Uniform { gap_extend, .. } | CostModel::Lookup { gap_extend, .. } => *gap_extend as i64,
        }
    }
}

/// Integer cell width chosen for a DP matrix, per `spec.md` §4.E's
/// "Integer width promotion rule". This port always computes in `i64`
/// internally (narrower monomorphizations are a memory/perf optimization
/// the original takes for SIMD lane packing, not a correctness
/// requirement); `CellWidth` instead governs the overflow check so callers
/// still get `OverflowRisk` exactly when a narrower real implementation
/// would need to promote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellWidth {
    W8,
    W16,
    Native,
}

impl CellWidth {
    fn select(n: usize) -> Self {
        if n < 256 {
            CellWidth::W8
        } else if n < 65536 {
            CellWidth::W16
        } else {
            CellWidth::Native
        }
    }

    fn max_abs(self) -> i64 {
        match self {
            CellWidth::W8 => i8::MAX as i64,
            CellWidth::W16 => i16::MAX as i64,
            CellWidth::Native => i64::MAX,
        }
    }
}

fn check_overflow(longer_len: usize, max_cost: i64) -> CoreResult<()> {
    let width = CellWidth::select(longer_len + 1);
    let worst_case = (longer_len as i64).saturating_mul(max_cost.max(1));
    if width != CellWidth::Native && worst_case > width.max_abs() {
        return Err(CoreError::OverflowRisk);
    }
    Ok(())
}

/// Unweighted (unit-cost) Levenshtein distance between two byte strings,
/// bounded early-exit per `sz_levenshtein_serial`.
pub fn levenshtein(a: &[u8], b: &[u8], bound: usize) -> usize {
    levenshtein_generic(a, b, bound, |x, y| x != y)
}

/// Weighted Levenshtein distance with a custom gap cost and 256x256
/// substitution matrix, ported from `sz_levenshtein_weighted_serial`.
pub fn levenshtein_weighted(a: &[u8], b: &[u8], gap: u8, subs: &[[u8; 256]; 256], bound: usize) -> usize {
    if a.is_empty() {
        return (b.len() * gap as usize).min(bound);
    }
    if b.is_empty() {
        return (a.len() * gap as usize).min(bound);
    }
    let len_diff = a.len().abs_diff(b.len());
    if len_diff * gap as usize > bound {
        return bound;
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (idx_a, &ca) in a.iter().enumerate() {
        current[0] = (idx_a + 1) * gap as usize;
        let mut min_distance = bound;
        for (idx_b, &cb) in b.iter().enumerate() {
            let cost_deletion = previous[idx_b + 1] + gap as usize;
            let cost_insertion = current[idx_b] + gap as usize;
            let cost_substitution = previous[idx_b] + subs[ca as usize][cb as usize] as usize;
            let best = cost_deletion.min(cost_insertion).min(cost_substitution);
            current[idx_b + 1] = best;
            min_distance = min_distance.min(best);
        }
        if min_distance >= bound {
            return bound;
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()].min(bound)
}

/// UTF-8 Levenshtein distance, operating on decoded Unicode scalar values
/// rather than raw bytes. ASCII-only inputs short-circuit back to the byte
/// path, per `spec.md` §4.E.
pub fn utf8_levenshtein(a: &str, b: &str, bound: usize) -> usize {
    if a.is_ascii() && b.is_ascii() {
        return levenshtein(a.as_bytes(), b.as_bytes(), bound);
    }
    let a_runes: Vec<u32> = a.chars().map(|c| c as u32).collect();
    let b_runes: Vec<u32> = b.chars().map(|c| c as u32).collect();
    levenshtein_generic(&a_runes, &b_runes, bound, |x, y| x != y)
}

/// UTF-8 Levenshtein distance over raw byte spans, for callers on the
/// other side of an ABI boundary that hand over unvalidated bytes rather
/// than a Rust `&str` (`spec.md` §6's status family includes `InvalidUtf8`
/// precisely for this entry point; the `&str`-typed [`utf8_levenshtein`]
/// can never hit it, since `&str` is already guaranteed valid).
pub fn utf8_levenshtein_bytes(a: &[u8], b: &[u8], bound: usize) -> CoreResult<usize> {
    let a = std::str::from_utf8(a).map_err(|_| CoreError::InvalidUtf8)?;
    let b = std::str::from_utf8(b).map_err(|_| CoreError::InvalidUtf8)?;
    Ok(utf8_levenshtein(a, b, bound))
}

fn levenshtein_generic<T: Copy>(a: &[T], b: &[T], bound: usize, differs: impl Fn(T, T) -> bool) -> usize {
    if a.is_empty() {
        return b.len().min(bound);
    }
    if b.is_empty() {
        return a.len().min(bound);
    }
    if a.len().abs_diff(b.len()) > bound {
        return bound;
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (idx_a, &ca) in a.iter().enumerate() {
        current[0] = idx_a + 1;
        let mut min_distance = bound;
        for (idx_b, &cb) in b.iter().enumerate() {
            let cost_deletion = previous[idx_b + 1] + 1;
            let cost_insertion = current[idx_b] + 1;
            let cost_substitution = previous[idx_b] + differs(ca, cb) as usize;
            let best = cost_deletion.min(cost_insertion).min(cost_substitution);
            current[idx_b + 1] = best;
            min_distance = min_distance.min(best);
        }
        if min_distance >= bound {
            return bound;
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()].min(bound)
}

/// Locality of an alignment scorer: global final-cell score, or local
/// running-maximum score (`spec.md` §4.E).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locality {
    Global,
    Local,
}

/// Global alignment score (Needleman-Wunsch), affine gap costs, byte input.
///
/// With `match=0, mismatch=-1, gap_open=gap_extend=-1` this equals the
/// negated unit-cost Levenshtein distance, per `spec.md` §8's scoring-
/// consistency property.
pub fn needleman_wunsch(a: &[u8], b: &[u8], costs: &CostModel) -> CoreResult<i64> {
    score_affine(a, b, costs, Locality::Global)
}

/// Local alignment score (Smith-Waterman), affine gap costs, byte input.
pub fn smith_waterman(a: &[u8], b: &[u8], costs: &CostModel) -> CoreResult<i64> {
    score_affine(a, b, costs, Locality::Local)
}

fn max_abs_cost(costs: &CostModel) -> i64 {
    let gap = costs.gap_open().abs().max(costs.gap_extend().abs());
    let subs = match costs {
        CostModel::Uniform { match_score, mismatch_score, .. } => {
            (*match_score as i64).abs().max((*mismatch_score as i64).abs())
        }
        CostModel::Lookup { substitutions, .. } => substitutions
            .iter()
            .flat_map(|row| row.iter())
            .map(|c| (*c as i64).abs())
            .max()
            .unwrap_or(0),
    };
    gap.max(subs)
}

/// Gotoh affine-gap DP, row-major, two rolling rows for each of the three
/// matrices (`H` = best ending in a match/mismatch, `E` = best ending in a
/// horizontal gap, `F` = best ending in a vertical gap).
fn score_affine(a: &[u8], b: &[u8], costs: &CostModel, locality: Locality) -> CoreResult<i64> {
    check_overflow(a.len().max(b.len()), max_abs_cost(costs))?;

    let open = costs.gap_open();
    let extend = costs.gap_extend();
    const NEG_INF: i64 = i64::MIN / 4;

    let cols = b.len() + 1;
    let mut h_prev = crate::alloc::try_filled_vec(cols, 0i64, "score_affine h_prev")?;
    let mut h_curr = crate::alloc::try_filled_vec(cols, 0i64, "score_affine h_curr")?;
    let mut e_curr = crate::alloc::try_filled_vec(cols, NEG_INF, "score_affine e_curr")?; // E never spans rows, reset and reused each row
    let mut f_col = crate::alloc::try_filled_vec(cols, NEG_INF, "score_affine f_col")?; // F only needs the previous row's value at each column

    let mut running_max = 0i64;

    match locality {
        Locality::Global => {
            for j in 1..cols {
                h_prev[j] = open + (j as i64 - 1) * extend;
            }
        }
        Locality::Local => {
            for j in 1..cols {
                h_prev[j] = 0;
            }
        }
    }

    for i in 1..=a.len() {
        h_curr[0] = match locality {
            Locality::Global => open + (i as i64 - 1) * extend,
            Locality::Local => 0,
        };
        e_curr[0] = NEG_INF;
        let f_top_left = f_col[0];
        f_col[0] = match locality {
            Locality::Global => (h_prev[0] + open).max(f_top_left + extend),
            Locality::Local => 0i64.max((h_prev[0] + open).max(f_top_left + extend)),
        };

        for j in 1..cols {
            let e = (h_curr[j - 1] + open).max(e_curr[j - 1] + extend);
            let f = (h_prev[j] + open).max(f_col[j] + extend);
            let diag = h_prev[j - 1] + costs.substitute(a[i - 1], b[j - 1]);
            let mut best = diag.max(e).max(f);
            if locality == Locality::Local {
                best = best.max(0);
                running_max = running_max.max(best);
            }
            e_curr[j] = e;
            f_col[j] = f;
            h_curr[j] = best;
        }

        std::mem::swap(&mut h_prev, &mut h_curr);
    }

    Ok(match locality {
        Locality::Global => h_prev[cols - 1],
        Locality::Local => running_max,
    })
}

/// UTF-8 affine-gap global/local alignment over decoded Unicode scalar
/// values. Pure-ASCII inputs short-circuit back to the byte path.
pub fn needleman_wunsch_utf8(a: &str, b: &str, costs: &CostModel) -> CoreResult<i64> {
    if a.is_ascii() && b.is_ascii() {
        return needleman_wunsch(a.as_bytes(), b.as_bytes(), costs);
    }
    score_affine_runes(a, b, costs, Locality::Global)
}

/// UTF-8 local alignment; see [`needleman_wunsch_utf8`].
pub fn smith_waterman_utf8(a: &str, b: &str, costs: &CostModel) -> CoreResult<i64> {
    if a.is_ascii() && b.is_ascii() {
        return smith_waterman(a.as_bytes(), b.as_bytes(), costs);
    }
    score_affine_runes(a, b, costs, Locality::Local)
}

/// UTF-8 global alignment over raw byte spans; see [`utf8_levenshtein_bytes`]
/// for why this wrapper, rather than [`needleman_wunsch_utf8`] itself,
/// is what can actually return [`CoreError::InvalidUtf8`].
pub fn needleman_wunsch_utf8_bytes(a: &[u8], b: &[u8], costs: &CostModel) -> CoreResult<i64> {
    let a = std::str::from_utf8(a).map_err(|_| CoreError::InvalidUtf8)?;
    let b = std::str::from_utf8(b).map_err(|_| CoreError::InvalidUtf8)?;
    needleman_wunsch_utf8(a, b, costs)
}

/// UTF-8 local alignment over raw byte spans; see [`utf8_levenshtein_bytes`].
pub fn smith_waterman_utf8_bytes(a: &[u8], b: &[u8], costs: &CostModel) -> CoreResult<i64> {
    let a = std::str::from_utf8(a).map_err(|_| CoreError::InvalidUtf8)?;
    let b = std::str::from_utf8(b).map_err(|_| CoreError::InvalidUtf8)?;
    smith_waterman_utf8(a, b, costs)
}

fn score_affine_runes(a: &str, b: &str, costs: &CostModel, locality: Locality) -> CoreResult<i64> {
    let a_runes: Vec<u32> = a.chars().map(|c| c as u32).collect();
    let b_runes: Vec<u32> = b.chars().map(|c| c as u32).collect();
    check_overflow(a_runes.len().max(b_runes.len()), max_abs_cost(costs))?;

    let open = costs.gap_open();
    let extend = costs.gap_extend();
    const NEG_INF: i64 = i64::MIN / 4;
    let cols = b_runes.len() + 1;
    let mut h_prev = crate::alloc::try_filled_vec(cols, 0i64, "score_affine_runes h_prev")?;
    let mut h_curr = crate::alloc::try_filled_vec(cols, 0i64, "score_affine_runes h_curr")?;
    let mut e_curr = crate::alloc::try_filled_vec(cols, NEG_INF, "score_affine_runes e_curr")?;
    let mut f_col = crate::alloc::try_filled_vec(cols, NEG_INF, "score_affine_runes f_col")?;
    let mut running_max = 0i64;

    if locality == Locality::Global {
        for j in 1..cols {
            h_prev[j] = open + (j as i64 - 1) * extend;
        }
    }

    for i in 1..=a_runes.len() {
        h_curr[0] = match locality {
            Locality::Global => open + (i as i64 - 1) * extend,
            Locality::Local => 0,
        };
        let f_top_left = f_col[0];
        f_col[0] = match locality {
            Locality::Global => (h_prev[0] + open).max(f_top_left + extend),
            Locality::Local => 0i64.max((h_prev[0] + open).max(f_top_left + extend)),
        };

        for j in 1..cols {
            let e = (h_curr[j - 1] + open).max(e_curr[j - 1] + extend);
            let f = (h_prev[j] + open).max(f_col[j] + extend);
            let diag = h_prev[j - 1] + costs.substitute_rune(a_runes[i - 1], b_runes[j - 1]);
            let mut best = diag.max(e).max(f);
            if locality == Locality::Local {
                best = best.max(0);
                running_max = running_max.max(best);
            }
            e_curr[j] = e;
            f_col[j] = f;
            h_curr[j] = best;
        }
        std::mem::swap(&mut h_prev, &mut h_curr);
    }

    Ok(match locality {
        Locality::Global => h_prev[cols - 1],
        Locality::Local => running_max,
    })
}

/// Bulk Levenshtein over two equal-length sequences of paired strings,
/// scoring `a[i]` against `b[i]` for every `i` and writing the result into
/// `out[i]`. This is the "invoke the engine with input sequences, an
/// executor, an output buffer" shape of `spec.md` §6: between-pair
/// parallelism happens here, one level above the single-pair scorer, via
/// `executor`. Returns [`CoreError::UnexpectedDimensions`] if `a` and `b`
/// don't have the same element count, or if `out` is too small.
pub fn levenshtein_bulk(
    a: &dyn StringSequence,
    b: &dyn StringSequence,
    bound: usize,
    executor: &dyn Executor,
    out: &mut [usize],
) -> CoreResult<()> {
    if a.len() != b.len() || out.len() < a.len() {
        return Err(CoreError::UnexpectedDimensions);
    }
    let count = a.len();
    let results = crate::executor::map_indices(executor, count, |i| levenshtein(a.get(i), b.get(i), bound));
    out[..count].copy_from_slice(&results);
    Ok(())
}

/// Bulk affine-gap alignment (Needleman-Wunsch or Smith-Waterman,
/// depending on `locality`) over two equal-length sequences of paired
/// strings, writing `out[i]` with the score of `a[i]` against `b[i]`.
/// Mirrors `spec.md` §6's entry-point shape and §4.E's "between-pair
/// parallelism happens one level up in the bulk driver" note. Returns
/// [`CoreError::UnexpectedDimensions`] on a length mismatch, and
/// propagates any per-pair [`CoreError::OverflowRisk`].
pub fn affine_bulk(
    a: &dyn StringSequence,
    b: &dyn StringSequence,
    costs: &CostModel,
    locality: Locality,
    executor: &dyn Executor,
    out: &mut [i64],
) -> CoreResult<()> {
    if a.len() != b.len() || out.len() < a.len() {
        return Err(CoreError::UnexpectedDimensions);
    }
    let count = a.len();
    let results: Vec<CoreResult<i64>> =
        crate::executor::map_indices(executor, count, |i| score_affine(a.get(i), b.get(i), costs, locality));
    for (slot, result) in out[..count].iter_mut().zip(results) {
        *slot = result?;
    }
    Ok(())
}
