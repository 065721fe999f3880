//! Result files: naming, appending and reading back

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::LedgerError;
use crate::algebra::{Element, FieldPolynomial, Poly, ONE};
use crate::search::{Candidate, Coefficients, SearchMode};

/// Parameters encoded in a result file name.
///
/// Fraction searches write `frac_<p>_<r>_<f>_<g>.txt`, polynomial
/// searches `<p>_<r>_deg<f>.txt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultFileName {
    /// Characteristic.
    pub p: u32,
    /// Extension degree.
    pub r: u32,
    /// Numerator degree.
    pub f_degree: usize,
    /// Denominator degree, 0 for polynomial searches.
    pub g_degree: usize,
}

impl ResultFileName {
    /// Polynomial or fraction results.
    pub fn mode(&self) -> SearchMode {
        if self.g_degree == 0 {
            SearchMode::Polynomial
        } else {
            SearchMode::Fraction
        }
    }

    fn stem(&self) -> String {
        match self.mode() {
            SearchMode::Fraction => format!(
                "frac_{}_{}_{}_{}",
                self.p, self.r, self.f_degree, self.g_degree
            ),
            SearchMode::Polynomial => format!("{}_{}_deg{}", self.p, self.r, self.f_degree),
        }
    }

    /// Result file name.
    pub fn results(&self) -> String {
        format!("{}.txt", self.stem())
    }

    /// Checkpoint file name.
    pub fn checkpoint(&self) -> String {
        format!("{}_save.txt", self.stem())
    }

    /// Permutation listing file name.
    pub fn permutations(&self) -> String {
        format!("{}_perms.txt", self.stem())
    }

    /// Recover the parameters from a result file name.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".txt")?;
        if let Some(rest) = stem.strip_prefix("frac_") {
            let parts: Vec<&str> = rest.split('_').collect();
            let [p, r, f, g] = parts.as_slice() else {
                return None;
            };
            Some(Self {
                p: p.parse().ok()?,
                r: r.parse().ok()?,
                f_degree: f.parse().ok()?,
                g_degree: g.parse().ok()?,
            })
        } else {
            let parts: Vec<&str> = stem.split('_').collect();
            let [p, r, f] = parts.as_slice() else {
                return None;
            };
            Some(Self {
                p: p.parse().ok()?,
                r: r.parse().ok()?,
                f_degree: f.strip_prefix("deg")?.parse().ok()?,
                g_degree: 0,
            })
        }
    }
}

/// Render one result line.
pub fn format_candidate(candidate: &Candidate, mode: SearchMode) -> String {
    match mode {
        SearchMode::Fraction => candidate.to_string(),
        SearchMode::Polynomial => Coefficients(&candidate.numerator).to_string(),
    }
}

/// Parse one result line.
pub fn parse_candidate(line: &str, mode: SearchMode) -> Result<Candidate, String> {
    fn coeffs(text: &str) -> Result<Poly, String> {
        let poly = text
            .split_whitespace()
            .map(|c| c.parse::<Element>().map_err(|_| format!("bad coefficient {c:?}")))
            .collect::<Result<Poly, _>>()?;
        if poly.is_empty() {
            return Err("empty polynomial".to_string());
        }
        Ok(poly)
    }
    match mode {
        SearchMode::Fraction => {
            let (f, g) = line
                .split_once('/')
                .ok_or_else(|| "expected \"f / g\"".to_string())?;
            Ok(Candidate::new(coeffs(f)?, coeffs(g)?))
        }
        SearchMode::Polynomial => Ok(Candidate::new(coeffs(line)?, vec![ONE])),
    }
}

/// Append-only writer for a result file.
///
/// Each class goes to the file in a single write, so an interrupted
/// process leaves at most a prefix of one class behind.
#[derive(Debug)]
pub struct ResultLog {
    path: PathBuf,
    mode: SearchMode,
    file: File,
}

impl ResultLog {
    /// Start a fresh file whose first line is the defining polynomial.
    pub fn create(
        path: impl Into<PathBuf>,
        irreducible: &FieldPolynomial,
        mode: SearchMode,
    ) -> Result<Self, LedgerError> {
        let path = path.into();
        let file = File::create(&path).map_err(LedgerError::io(&path))?;
        let mut log = Self { file, path, mode };
        log.write_text(&format!("{irreducible}\n"))?;
        Ok(log)
    }

    /// Reopen a file read by [`read_results`] for appending, cutting off
    /// any unterminated last line first.
    pub fn reopen(
        path: impl Into<PathBuf>,
        contents: &ResultFile,
        mode: SearchMode,
    ) -> Result<Self, LedgerError> {
        let path = path.into();
        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(LedgerError::io(&path))?;
        if let Some(torn) = &contents.torn_tail {
            warn!(path = %path.display(), line = %torn, "dropping unterminated result line");
            file.set_len(contents.intact_len)
                .map_err(LedgerError::io(&path))?;
        }
        Ok(Self { file, path, mode })
    }

    /// Location on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `candidates` as one block; returns the number of lines.
    pub fn write_class<'a>(
        &mut self,
        candidates: impl IntoIterator<Item = &'a Candidate>,
    ) -> Result<usize, LedgerError> {
        let mut block = String::new();
        let mut written = 0;
        for candidate in candidates {
            block.push_str(&format_candidate(candidate, self.mode));
            block.push('\n');
            written += 1;
        }
        if written > 0 {
            self.write_text(&block)?;
        }
        Ok(written)
    }

    fn write_text(&mut self, text: &str) -> Result<(), LedgerError> {
        self.file
            .write_all(text.as_bytes())
            .map_err(LedgerError::io(&self.path))?;
        self.file.flush().map_err(LedgerError::io(&self.path))
    }
}

/// A result file read back into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultFile {
    /// First line: the defining polynomial as rendered.
    pub header: String,
    /// Every complete candidate line, in file order.
    pub candidates: Vec<Candidate>,
    /// Bytes up to and including the last newline.
    pub intact_len: u64,
    /// Text after the last newline, left by an interrupted write.
    pub torn_tail: Option<String>,
}

/// Read a result file written by [`ResultLog`] for the search `names`.
///
/// A final line without its newline is reported in
/// [`ResultFile::torn_tail`] instead of being parsed. Every other line must
/// carry exactly the coefficient counts of the named degrees.
pub fn read_results(path: &Path, names: &ResultFileName) -> Result<ResultFile, LedgerError> {
    let text = fs::read_to_string(path).map_err(LedgerError::io(path))?;
    let (body, torn_tail) = match text.rfind('\n') {
        Some(end) if end + 1 < text.len() && text[end + 1..].trim().is_empty() => {
            (text.as_str(), None)
        }
        Some(end) if end + 1 < text.len() => (&text[..=end], Some(text[end + 1..].to_string())),
        _ => (text.as_str(), None),
    };

    let mut lines = body.lines();
    let header = lines
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .ok_or_else(|| LedgerError::CorruptResults {
            line: 1,
            reason: "missing defining polynomial".to_string(),
        })?
        .to_string();

    let mode = names.mode();
    let mut candidates = Vec::new();
    for (i, line) in lines.enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let corrupt = |reason: String| LedgerError::CorruptResults {
            line: i + 2,
            reason,
        };
        let candidate = parse_candidate(line, mode).map_err(corrupt)?;
        if candidate.numerator.len() != names.f_degree + 1 {
            return Err(corrupt(format!(
                "numerator has {} coefficients, expected {}",
                candidate.numerator.len(),
                names.f_degree + 1
            )));
        }
        if candidate.denominator.len() != names.g_degree + 1 {
            return Err(corrupt(format!(
                "denominator has {} coefficients, expected {}",
                candidate.denominator.len(),
                names.g_degree + 1
            )));
        }
        candidates.push(candidate);
    }
    Ok(ResultFile {
        header,
        candidates,
        intact_len: body.len() as u64,
        torn_tail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let frac = ResultFileName {
            p: 2,
            r: 4,
            f_degree: 5,
            g_degree: 2,
        };
        assert_eq!(frac.results(), "frac_2_4_5_2.txt");
        assert_eq!(frac.checkpoint(), "frac_2_4_5_2_save.txt");
        assert_eq!(ResultFileName::parse("frac_2_4_5_2.txt"), Some(frac));

        let poly = ResultFileName {
            p: 3,
            r: 2,
            f_degree: 6,
            g_degree: 0,
        };
        assert_eq!(poly.results(), "3_2_deg6.txt");
        assert_eq!(poly.permutations(), "3_2_deg6_perms.txt");
        assert_eq!(ResultFileName::parse("3_2_deg6.txt"), Some(poly));
        assert_eq!(ResultFileName::parse("3_2_6.txt"), None);
    }

    #[test]
    fn test_candidate_lines() {
        let c = Candidate::new(vec![1, 0, 4], vec![1, 2]);
        let line = format_candidate(&c, SearchMode::Fraction);
        assert_eq!(line, "1 0 4 / 1 2");
        assert_eq!(parse_candidate(&line, SearchMode::Fraction), Ok(c));

        let p = Candidate::new(vec![1, 0, 4], vec![1]);
        let line = format_candidate(&p, SearchMode::Polynomial);
        assert_eq!(line, "1 0 4");
        assert_eq!(parse_candidate(&line, SearchMode::Polynomial), Ok(p));
        assert!(parse_candidate("1 x", SearchMode::Polynomial).is_err());
    }

    fn scratch(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "permsearch-results-{label}-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    const FRAC: ResultFileName = ResultFileName {
        p: 3,
        r: 1,
        f_degree: 2,
        g_degree: 1,
    };

    #[test]
    fn test_unterminated_last_line_is_set_aside() {
        let dir = scratch("torn");
        let path = dir.join(FRAC.results());
        fs::write(&path, "x + 1\n1 2 0 / 1 1\n1 1 0 /").unwrap();

        let contents = read_results(&path, &FRAC).unwrap();
        assert_eq!(contents.candidates, vec![Candidate::new(vec![1, 2, 0], vec![1, 1])]);
        assert_eq!(contents.torn_tail.as_deref(), Some("1 1 0 /"));
        assert_eq!(contents.intact_len, "x + 1\n1 2 0 / 1 1\n".len() as u64);

        let mut log = ResultLog::reopen(&path, &contents, SearchMode::Fraction).unwrap();
        log.write_class([&Candidate::new(vec![1, 1, 0], vec![1, 2])])
            .unwrap();
        drop(log);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "x + 1\n1 2 0 / 1 1\n1 1 0 / 1 2\n"
        );
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_coefficient_counts_must_match_degrees() {
        let dir = scratch("counts");
        let path = dir.join(FRAC.results());
        fs::write(&path, "x + 1\n1 2 0 / 1 1\n1 2 / 1 1\n").unwrap();
        assert!(matches!(
            read_results(&path, &FRAC),
            Err(LedgerError::CorruptResults { line: 3, .. })
        ));

        fs::write(&path, "x + 1\n1 2 0 / 1\n").unwrap();
        assert!(matches!(
            read_results(&path, &FRAC),
            Err(LedgerError::CorruptResults { line: 2, .. })
        ));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_class_is_written_as_one_block() {
        let dir = scratch("class");
        let path = dir.join(FRAC.results());
        let header = FieldPolynomial::new(vec![1, 1], 3);
        let mut log = ResultLog::create(&path, &header, SearchMode::Fraction).unwrap();
        let class = [
            Candidate::new(vec![1, 0, 0], vec![1, 1]),
            Candidate::new(vec![1, 1, 0], vec![1, 1]),
        ];
        assert_eq!(log.write_class(&class).unwrap(), 2);
        assert_eq!(log.write_class(std::iter::empty()).unwrap(), 0);
        drop(log);

        let contents = read_results(&path, &FRAC).unwrap();
        assert_eq!(contents.header, header.to_string());
        assert_eq!(contents.candidates, class.to_vec());
        assert_eq!(contents.torn_tail, None);
        fs::remove_dir_all(&dir).unwrap();
    }
}
