use std::fmt;

/// One digit of the mixed-radix counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digit {
    pub cursor: usize,
    pub length: usize,
}

/**
 *  Advances the counter by one, where 'digits[0]' is the least-significant
 *  (fastest-varying) digit. Digits that are already at their last position
 *  are reset to zero (carry), until one of them can be incremented.
 *
 *  Returns 'false' once every digit has wrapped around, i.e. the counter has
 *  visited every combination.
 */
pub fn carry(digits: &mut [Digit]) -> bool {
    for digit in digits.iter_mut() {
        if digit.cursor + 1 < digit.length {
            digit.cursor += 1;
            return true;
        }
        digit.cursor = 0;
    }
    false
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Odometer {
    digits: Vec<Digit>,
}

impl Odometer {
    /// No odometer exists if any digit has no positions at all.
    pub fn new(lengths: &[usize]) -> Option<Self> {
        if lengths.iter().any(|&n| n == 0) {
            return None;
        }
        let digits = lengths
            .iter()
            .map(|&length| Digit { cursor: 0, length })
            .collect();
        Some(Self { digits })
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn cursor(&self, digit: usize) -> usize {
        self.digits[digit].cursor
    }

    pub fn cursors(&self) -> impl Iterator<Item = usize> + '_ {
        self.digits.iter().map(|d| d.cursor)
    }

    pub fn advance(&mut self) -> bool {
        carry(&mut self.digits)
    }

    /// Number of distinct counter states, saturating at 'u64::MAX'.
    pub fn size(&self) -> u64 {
        self.digits
            .iter()
            .fold(1u64, |n, d| n.saturating_mul(d.length as u64))
    }
}

impl fmt::Display for Odometer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let cs: Vec<String> = self
            .digits
            .iter()
            .map(|d| format!("{}/{}", d.cursor, d.length))
            .collect();
        write!(f, "[{}]", cs.join(" "))
    }
}
