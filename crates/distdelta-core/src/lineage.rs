// crates/distdelta-core/src/lineage.rs

//! Lineage identification: pairing archives of one package version with the
//! archives of the next version that most likely descend from them.

use std::collections::HashMap;

use tracing::debug;

/// One proposed (source, destination) pairing.
#[derive(Clone, Debug, PartialEq)]
pub struct LineageMatch {
    pub source: String,
    pub destination: String,
    /// Average of common prefix and common suffix lengths, in characters.
    pub score: f64,
}

/// `(len(common prefix) + len(common suffix)) / 2`
pub fn score(a: &str, b: &str) -> f64 {
    affinity(a, b) as f64 / 2.0
}

// Twice the score; integral so ties compare exactly.
fn affinity(a: &str, b: &str) -> usize {
    let prefix = a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count();
    let suffix = a
        .chars()
        .rev()
        .zip(b.chars().rev())
        .take_while(|(x, y)| x == y)
        .count();
    prefix + suffix
}

/// Best destination for `source`, or `None` when nothing scores above zero,
/// when two destinations share the top score, or when the winner is `source`
/// itself (an unchanged archive needs no delta).
pub fn best_match(source: &str, destinations: &[String]) -> Option<LineageMatch> {
    let mut best: Option<(&str, usize)> = None;
    let mut tied = false;

    for dest in dedup(destinations) {
        let a = affinity(source, dest);
        match best {
            Some((_, top)) if a == top => tied = true,
            Some((_, top)) if a < top => {}
            _ => {
                best = Some((dest, a));
                tied = false;
            }
        }
    }

    let (dest, a) = best?;
    if a == 0 {
        return None;
    }
    if tied {
        debug!(source, score = a as f64 / 2.0, "ambiguous lineage, no match");
        return None;
    }
    if dest == source {
        return None;
    }
    Some(LineageMatch {
        source: source.to_string(),
        destination: dest.to_string(),
        score: a as f64 / 2.0,
    })
}

/// Pairs the archives of two consecutive versions.
///
/// Each source proposes its best destination; when several sources claim the
/// same destination only the highest-scoring claim survives. An equal score
/// does not displace the claim made first. Output follows `sources` order of
/// the surviving claims and is deterministic for a given input.
pub fn match_transition(sources: &[String], destinations: &[String]) -> Vec<LineageMatch> {
    let mut claims = Claims::default();
    claims.propose_all(0, sources, destinations);
    claims.into_matches().into_iter().map(|(_, m)| m).collect()
}

/// Pairs every consecutive pair of an ordered version history. Each entry is
/// `(transition index, match)`, where index `i` pairs version `i` with
/// version `i + 1`.
///
/// Claims are resolved across the whole history: an archive name that shows
/// up unchanged in several versions is claimed at most once, by the
/// strongest proposal from any transition.
pub fn match_history(versions: &[Vec<String>]) -> Vec<(usize, LineageMatch)> {
    let mut claims = Claims::default();
    for (i, pair) in versions.windows(2).enumerate() {
        claims.propose_all(i, &pair[0], &pair[1]);
    }
    claims.into_matches()
}

/// Surviving proposals, at most one per destination name.
#[derive(Default)]
struct Claims {
    kept: Vec<(usize, LineageMatch)>,
    by_destination: HashMap<String, usize>,
}

impl Claims {
    fn propose_all(&mut self, transition: usize, sources: &[String], destinations: &[String]) {
        for source in dedup(sources) {
            if let Some(m) = best_match(source, destinations) {
                self.propose(transition, m);
            }
        }
    }

    fn propose(&mut self, transition: usize, m: LineageMatch) {
        match self.by_destination.get(&m.destination) {
            Some(&i) if self.kept[i].1.score >= m.score => {
                debug!(
                    source = %m.source,
                    destination = %m.destination,
                    holder = %self.kept[i].1.source,
                    "lineage claim lost to an earlier source"
                );
            }
            Some(&i) => {
                debug!(
                    source = %m.source,
                    destination = %m.destination,
                    displaced = %self.kept[i].1.source,
                    "lineage claim displaced"
                );
                self.kept[i] = (transition, m);
            }
            None => {
                self.by_destination.insert(m.destination.clone(), self.kept.len());
                self.kept.push((transition, m));
            }
        }
    }

    fn into_matches(mut self) -> Vec<(usize, LineageMatch)> {
        self.kept.sort_by_key(|(transition, _)| *transition);
        self.kept
    }
}

fn dedup(names: &[String]) -> Vec<&str> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .map(String::as_str)
        .filter(|n| seen.insert(*n))
        .collect()
}
