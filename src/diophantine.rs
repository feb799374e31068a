//! Integer solutions of one linear equation `a1*x1 + ... + ak*xk = c`.

use std::fmt;
use std::str::FromStr;

use crate::error::EquationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearEquation {
    /// Coefficient and unknown name, one entry per distinct unknown.
    pub terms: Vec<(i64, String)>,
    pub rhs: i64,
}

/// General solution: `particular + t1*basis[0] + ... + tn*basis[n-1]` for
/// arbitrary integers `t`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub particular: Vec<i64>,
    pub basis: Vec<Vec<i64>>,
}

impl LinearEquation {
    pub fn new(rhs: i64) -> Self {
        Self {
            terms: Vec::new(),
            rhs,
        }
    }

    /// Adds `coefficient * name`, merging with an existing term of that name.
    pub fn add_term(&mut self, coefficient: i64, name: &str) -> Result<(), EquationError> {
        match self.terms.iter_mut().find(|(_, n)| n == name) {
            Some((c, _)) => *c = c.checked_add(coefficient).ok_or(EquationError::Overflow)?,
            None => self.terms.push((coefficient, name.to_string())),
        }
        Ok(())
    }

    pub fn unknowns(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(_, name)| name.as_str())
    }

    /// Left-hand side evaluated at `values`; missing values count as 0.
    /// `None` if the sum leaves the `i64` range.
    pub fn lhs(&self, values: &[i64]) -> Option<i64> {
        self.terms
            .iter()
            .zip(values.iter().chain(std::iter::repeat(&0)))
            .try_fold(0i64, |sum, ((c, _), v)| sum.checked_add(c.checked_mul(*v)?))
    }

    /// `Ok(None)` when the equation has no integer solution.
    pub fn solve(&self) -> Result<Option<Solution>, EquationError> {
        let a: Vec<i64> = self.terms.iter().map(|(c, _)| *c).collect();
        let k = a.len();
        if k == 0 {
            return Ok((self.rhs == 0).then(|| Solution {
                particular: Vec::new(),
                basis: Vec::new(),
            }));
        }

        let (acc, mut columns) = reduce(&a).ok_or(EquationError::Overflow)?;
        if acc == 0 {
            return Ok((self.rhs == 0).then(|| Solution {
                particular: vec![0; k],
                basis: columns,
            }));
        }
        if self.rhs % acc != 0 {
            return Ok(None);
        }
        let scale = self.rhs / acc;
        let particular = columns
            .remove(0)
            .into_iter()
            .map(|v| v.checked_mul(scale))
            .collect::<Option<Vec<i64>>>()
            .ok_or(EquationError::Overflow)?;
        Ok(Some(Solution {
            particular,
            basis: columns,
        }))
    }
}

/// Unimodular column operations until `a * U = (g, 0, ..., 0)` with `g >= 0`.
/// Returns `g` and the columns of `U`, or `None` on overflow.
fn reduce(a: &[i64]) -> Option<(i64, Vec<Vec<i64>>)> {
    let k = a.len();
    let mut columns: Vec<Vec<i64>> = (0..k).map(|j| unit_vector(k, j)).collect();
    let mut acc = a[0];
    for j in 1..k {
        let aj = a[j];
        if aj == 0 {
            continue;
        }
        let (g, s, t) = extended_gcd(acc, aj)?;
        let first = combine(s, &columns[0], t, &columns[j])?;
        let other = combine(aj.checked_neg()? / g, &columns[0], acc / g, &columns[j])?;
        columns[0] = first;
        columns[j] = other;
        acc = g;
    }
    if acc < 0 {
        acc = acc.checked_neg()?;
        for v in &mut columns[0] {
            *v = v.checked_neg()?;
        }
    }
    Some((acc, columns))
}

impl Solution {
    /// `None` if a value leaves the `i64` range.
    pub fn evaluate(&self, params: &[i64]) -> Option<Vec<i64>> {
        let mut values = self.particular.clone();
        for (direction, &t) in self.basis.iter().zip(params) {
            for (v, d) in values.iter_mut().zip(direction) {
                *v = v.checked_add(t.checked_mul(*d)?)?;
            }
        }
        Some(values)
    }

    /// The particular solution solves `eq` and every basis vector solves its
    /// homogeneous version.
    pub fn satisfies(&self, eq: &LinearEquation) -> bool {
        eq.lhs(&self.particular) == Some(eq.rhs)
            && self.basis.iter().all(|d| eq.lhs(d) == Some(0))
    }
}

fn unit_vector(k: usize, j: usize) -> Vec<i64> {
    let mut v = vec![0; k];
    v[j] = 1;
    v
}

fn combine(s: i64, x: &[i64], t: i64, y: &[i64]) -> Option<Vec<i64>> {
    x.iter()
        .zip(y)
        .map(|(a, b)| s.checked_mul(*a)?.checked_add(t.checked_mul(*b)?))
        .collect()
}

/// `(g, s, t)` with `a*s + b*t == g` and `g >= 0`.
fn extended_gcd(a: i64, b: i64) -> Option<(i64, i64, i64)> {
    if b == 0 {
        return if a < 0 { Some((a.checked_neg()?, -1, 0)) } else { Some((a, 1, 0)) };
    }
    let (g, s, t) = extended_gcd(b, a.checked_rem(b)?)?;
    let q = a.checked_div(b)?;
    Some((g, t, s.checked_sub(q.checked_mul(t)?)?))
}

impl fmt::Display for LinearEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            write!(f, "0")?;
        }
        for (i, (c, name)) in self.terms.iter().enumerate() {
            match (i, *c < 0) {
                (_, true) => write!(f, "-{}*{name}", c.unsigned_abs())?,
                (0, false) => write!(f, "{c}*{name}")?,
                (_, false) => write!(f, "+{c}*{name}")?,
            }
        }
        write!(f, "={}", self.rhs)
    }
}

impl FromStr for LinearEquation {
    type Err = EquationError;

    /// Accepts `c*name` terms joined by `+`/`-`; bare integers move to the
    /// right-hand side and a bare name has coefficient 1.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lhs, rhs) = s.split_once('=').ok_or(EquationError::MissingEquals)?;
        let rhs = rhs.trim();
        let mut eq = LinearEquation::new(
            rhs.parse()
                .map_err(|_| EquationError::Rhs(rhs.to_string()))?,
        );

        let chunks = split_signed(lhs);
        let last = chunks.len() - 1;
        for (i, (sign, text)) in chunks.into_iter().enumerate() {
            let text = text.trim();
            if text.is_empty() {
                if i == 0 && last > 0 {
                    continue;
                }
                return Err(EquationError::Term(text.to_string()));
            }
            if let Ok(constant) = text.parse::<i64>() {
                eq.rhs = constant
                    .checked_mul(sign)
                    .and_then(|c| eq.rhs.checked_sub(c))
                    .ok_or(EquationError::Overflow)?;
                continue;
            }
            let (coefficient, name) = match text.split_once('*') {
                Some((c, rest)) => match c.trim().parse::<i64>() {
                    Ok(c) => (c, rest.trim()),
                    Err(_) => (1, text),
                },
                None => (1, text),
            };
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(EquationError::Term(text.to_string()));
            }
            let coefficient = coefficient.checked_mul(sign).ok_or(EquationError::Overflow)?;
            eq.add_term(coefficient, name)?;
        }
        Ok(eq)
    }
}

fn split_signed(lhs: &str) -> Vec<(i64, &str)> {
    let mut chunks = Vec::new();
    let mut sign = 1;
    let mut start = 0;
    for (i, c) in lhs.char_indices() {
        if c == '+' || c == '-' {
            chunks.push((sign, &lhs[start..i]));
            sign = if c == '-' { -1 } else { 1 };
            start = i + 1;
        }
    }
    chunks.push((sign, &lhs[start..]));
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(s: &str) -> LinearEquation {
        s.parse().unwrap()
    }

    fn solved(s: &str) -> Option<Solution> {
        eq(s).solve().unwrap()
    }

    #[test]
    fn parses_and_prints() {
        let e = eq("3*x + 5*y = 7");
        assert_eq!(e.terms, vec![(3, "x".to_string()), (5, "y".to_string())]);
        assert_eq!(e.rhs, 7);
        assert_eq!(e.to_string(), "3*x+5*y=7");
        assert_eq!(eq("-2*a+b=0").to_string(), "-2*a+1*b=0");
    }

    #[test]
    fn constants_move_to_the_right() {
        let e = eq("2*{x0}+3=9");
        assert_eq!(e.rhs, 6);
        assert_eq!(e.terms.len(), 1);
    }

    #[test]
    fn repeated_names_are_merged() {
        let e = eq("2*{x0}*{b1}+1*{x0}*{b1}=6");
        assert_eq!(e.terms, vec![(3, "{x0}*{b1}".to_string())]);
    }

    #[test]
    fn malformed_equations() {
        assert_eq!(
            "2*x".parse::<LinearEquation>(),
            Err(EquationError::MissingEquals)
        );
        assert_eq!(
            "2*x=abc".parse::<LinearEquation>(),
            Err(EquationError::Rhs("abc".to_string()))
        );
        assert!(matches!(
            "2*x+=3".parse::<LinearEquation>(),
            Err(EquationError::Term(_))
        ));
    }

    #[test]
    fn two_unknowns() {
        let e = eq("3*x+5*y=7");
        let s = solved("3*x+5*y=7").unwrap();
        assert!(s.satisfies(&e));
        assert_eq!(s.basis.len(), 1);
        for t in -3..=3 {
            assert_eq!(e.lhs(&s.evaluate(&[t]).unwrap()), Some(7));
        }
    }

    #[test]
    fn three_unknowns() {
        let e = eq("6*x+10*y+15*z=1");
        let s = solved("6*x+10*y+15*z=1").unwrap();
        assert!(s.satisfies(&e));
        assert_eq!(s.basis.len(), 2);
        assert_eq!(e.lhs(&s.evaluate(&[2, -5]).unwrap()), Some(1));
    }

    #[test]
    fn no_solution_when_gcd_does_not_divide() {
        assert_eq!(solved("2*x+4*y=5"), None);
    }

    #[test]
    fn single_unknown() {
        let s = solved("4*x=12").unwrap();
        assert_eq!(s.particular, vec![3]);
        assert!(s.basis.is_empty());
        assert_eq!(solved("-4*x=12").unwrap().particular, vec![-3]);
        assert_eq!(solved("4*x=10"), None);
    }

    #[test]
    fn zero_coefficients() {
        let s = solved("0*x=0").unwrap();
        assert_eq!(s.basis, vec![vec![1]]);
        assert_eq!(solved("0*x=1"), None);
        assert!(LinearEquation::new(0).solve().unwrap().is_some());
        assert!(LinearEquation::new(2).solve().unwrap().is_none());
    }

    #[test]
    fn large_coefficients_report_overflow() {
        // 5*(-1) + 3*2 = 1, so the particular solution is (-rhs, 2*rhs).
        assert_eq!(
            eq("5*x+3*y=9223372036854775807").solve(),
            Err(EquationError::Overflow)
        );
        assert_eq!(
            "9223372036854775807*x+1*x=1".parse::<LinearEquation>(),
            Err(EquationError::Overflow)
        );
        assert_eq!(eq("9223372036854775807*x=1").lhs(&[2]), None);

        let e = eq("9223372036854775807*x+9223372036854775806*y=1");
        let s = e.solve().unwrap().unwrap();
        assert_eq!(s.particular, vec![1, -1]);
        assert_eq!(s.evaluate(&[i64::MAX]), None);
    }
}
