use serde::Deserialize;

/// Predicate selecting a subset of particle IDs.
///
/// Built once from configuration and only queried afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum IDRange {
    All,
    None,
    Single { id: usize },
    List { ids: Vec<usize> },
    /// Half-open interval `[start, end)`.
    Range { start: usize, end: usize },
    Union { a: Box<IDRange>, b: Box<IDRange> },
    Intersection { a: Box<IDRange>, b: Box<IDRange> },
}

impl IDRange {
    pub fn contains(&self, id: usize) -> bool {
        match self {
            IDRange::All => true,
            IDRange::None => false,
            IDRange::Single { id: single } => *single == id,
            IDRange::List { ids } => ids.contains(&id),
            IDRange::Range { start, end } => id >= *start && id < *end,
            IDRange::Union { a, b } => a.contains(id) || b.contains(id),
            IDRange::Intersection { a, b } => a.contains(id) && b.contains(id),
        }
    }

    /// Member IDs among the first `n` particles, in ascending order.
    pub fn iter(&self, n: usize) -> impl Iterator<Item = usize> + '_ {
        (0..n).filter(move |id| self.contains(*id))
    }

    pub fn count(&self, n: usize) -> usize {
        self.iter(n).count()
    }

    pub fn union(a: IDRange, b: IDRange) -> IDRange {
        IDRange::Union { a: Box::new(a), b: Box::new(b) }
    }

    pub fn intersection(a: IDRange, b: IDRange) -> IDRange {
        IDRange::Intersection { a: Box::new(a), b: Box::new(b) }
    }
}

/// Predicate selecting unordered pairs of particle IDs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum IDPairRange {
    All,
    None,
    /// Both particles belong to `range`.
    Single { range: IDRange },
    /// One particle in each range.
    Pair { a: IDRange, b: IDRange },
    /// Consecutive IDs `(i, i + 1)` inside `[start, end)`.
    Chain { start: usize, end: usize },
    /// A chain closed by the bond `(start, end - 1)`.
    Ring { start: usize, end: usize },
    /// The two end particles of each chain of length `interval` packed into `[start, end)`.
    ChainEnds { start: usize, end: usize, interval: usize },
    Union { a: Box<IDPairRange>, b: Box<IDPairRange> },
    Intersection { a: Box<IDPairRange>, b: Box<IDPairRange> },
}

impl IDPairRange {
    pub fn contains_pair(&self, p1: usize, p2: usize) -> bool {
        let (lo, hi) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
        match self {
            IDPairRange::All => true,
            IDPairRange::None => false,
            IDPairRange::Single { range } => range.contains(lo) && range.contains(hi),
            IDPairRange::Pair { a, b } => {
                (a.contains(lo) && b.contains(hi)) || (a.contains(hi) && b.contains(lo))
            }
            IDPairRange::Chain { start, end } => lo >= *start && hi < *end && hi - lo == 1,
            IDPairRange::Ring { start, end } => {
                if lo < *start || hi >= *end {
                    return false;
                }
                hi - lo == 1 || (lo == *start && hi + 1 == *end && end - start > 2)
            }
            IDPairRange::ChainEnds { start, end, interval } => {
                if *interval < 2 || lo < *start || hi >= *end {
                    return false;
                }
                (lo - start) % interval == 0 && hi - lo == interval - 1
            }
            IDPairRange::Union { a, b } => a.contains_pair(lo, hi) || b.contains_pair(lo, hi),
            IDPairRange::Intersection { a, b } => a.contains_pair(lo, hi) && b.contains_pair(lo, hi),
        }
    }

    /// Whether `id` can take part in any pair of this range.
    pub fn involves(&self, id: usize) -> bool {
        match self {
            IDPairRange::All => true,
            IDPairRange::None => false,
            IDPairRange::Single { range } => range.contains(id),
            IDPairRange::Pair { a, b } => a.contains(id) || b.contains(id),
            IDPairRange::Chain { start, end }
            | IDPairRange::Ring { start, end }
            | IDPairRange::ChainEnds { start, end, .. } => id >= *start && id < *end,
            IDPairRange::Union { a, b } => a.involves(id) || b.involves(id),
            IDPairRange::Intersection { a, b } => a.involves(id) && b.involves(id),
        }
    }
}
