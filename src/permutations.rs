//! Expansion of search results into explicit permutations
//!
//! Every result `f/g` stands for the family `a·(f/g)(x+b) + c`. The
//! expansion walks that family and writes each member as the list of its
//! values at the field elements `0..n`, one permutation per line.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::algebra::{ArithmeticError, Element, Field, PolyRing, ONE, ZERO};
use crate::ledger::{read_results, LedgerError, ResultFileName};
use crate::search::{rebuild_field, Candidate};
use crate::SearchError;

/// Ranges of the affine parameters `a`, `b` and `c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffineRanges {
    /// Scale `a`, never zero.
    pub scale: Range<Element>,
    /// Input shift `b`.
    pub shift: Range<Element>,
    /// Output offset `c`.
    pub offset: Range<Element>,
}

impl AffineRanges {
    /// Full ranges for results of `names` over `field`.
    ///
    /// When the normalized degree is divisible by p the search already
    /// fixed the shift, so only `b = 0` is expanded. `normalized_only`
    /// keeps just `a = 1, b = 0, c = 0`.
    pub fn new(field: &Field, names: &ResultFileName, normalized_only: bool) -> Self {
        if normalized_only {
            return Self {
                scale: ONE..ONE + 1,
                shift: ZERO..ZERO + 1,
                offset: ZERO..ZERO + 1,
            };
        }
        let p = field.characteristic() as usize;
        let normalized_degree = match names.g_degree {
            0 => names.f_degree,
            g => g,
        };
        let shift = if normalized_degree % p == 0 {
            ZERO..ZERO + 1
        } else {
            field.elements()
        };
        Self {
            scale: field.nonzero(),
            shift,
            offset: field.elements(),
        }
    }

    /// Permutations produced per result.
    pub fn len(&self) -> u64 {
        self.scale.len() as u64 * self.shift.len() as u64 * self.offset.len() as u64
    }

    /// True if no permutation would be produced.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Call `emit` with every permutation in the family of `candidate`.
pub fn expand_candidate<E>(
    ring: &PolyRing<'_>,
    candidate: &Candidate,
    ranges: &AffineRanges,
    mut emit: impl FnMut(&[Element]) -> Result<(), E>,
) -> Result<(), E>
where
    E: From<ArithmeticError>,
{
    let field = ring.field();
    let mut perm = vec![ZERO; field.order() as usize];
    for b in ranges.shift.clone() {
        let f_values = ring.eval_all(&ring.shift(&candidate.numerator, b));
        let g_values = ring.eval_all(&ring.shift(&candidate.denominator, b));
        let base = f_values
            .iter()
            .zip(&g_values)
            .map(|(&f, &g)| field.div(f, g))
            .collect::<Result<Vec<_>, _>>()?;
        for a in ranges.scale.clone() {
            for c in ranges.offset.clone() {
                for (slot, &v) in perm.iter_mut().zip(&base) {
                    *slot = field.add(field.mul(a, v), c);
                }
                emit(&perm)?;
            }
        }
    }
    Ok(())
}

/// Written permutation file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermutationFile {
    /// Output location, next to the result file.
    pub path: PathBuf,
    /// Results read.
    pub results: usize,
    /// Permutations written.
    pub count: u64,
}

/// Expand the result file at `results_path` into `<stem>_perms.txt`.
pub fn write_permutations(
    results_path: &Path,
    normalized_only: bool,
) -> Result<PermutationFile, SearchError> {
    let names = results_path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(ResultFileName::parse)
        .ok_or_else(|| {
            SearchError::InvalidConfig(format!(
                "{} is not a result file name",
                results_path.display()
            ))
        })?;
    let results = read_results(results_path, &names)?;
    let field = rebuild_field(names.p, names.r, &results.header)?;
    let ring = PolyRing::new(&field);
    let ranges = AffineRanges::new(&field, &names, normalized_only);

    let path = results_path.with_file_name(names.permutations());
    let file = File::create(&path).map_err(LedgerError::io(&path))?;
    let mut writer = BufWriter::new(file);
    let mut count = 0u64;
    let mut line = String::new();
    for candidate in &results.candidates {
        expand_candidate(&ring, candidate, &ranges, |perm| -> Result<(), SearchError> {
            line.clear();
            for (i, v) in perm.iter().enumerate() {
                if i > 0 {
                    line.push(' ');
                }
                line.push_str(&v.to_string());
            }
            writeln!(writer, "{line}").map_err(LedgerError::io(&path))?;
            count += 1;
            Ok(())
        })?;
    }
    writer.flush().map_err(LedgerError::io(&path))?;

    info!(
        results = results.candidates.len(),
        permutations = count,
        path = %path.display(),
        "permutations written"
    );
    Ok(PermutationFile {
        path,
        results: results.candidates.len(),
        count,
    })
}
