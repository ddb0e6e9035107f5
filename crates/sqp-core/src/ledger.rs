//! The per-quarter keyword ledger.
//!
//! A ledger owns the locked top-N keyword set for one (ASIN, quarter) pair,
//! each keyword's week-by-week metric history, its current placement flags,
//! and an append-only list of placement alerts. Once locked, the keyword set
//! and ranks never change; history grows one whole week at a time.

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  calendar::{Quarter, WEEKS_PER_QUARTER},
  config::Thresholds,
  metric::{KeywordMetrics, WeeklyMetric},
};

// ─── Alerts ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
  DroppedFromTitle,
  DroppedFromBackend,
}

impl AlertKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::DroppedFromTitle => "dropped_from_title",
      Self::DroppedFromBackend => "dropped_from_backend",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "dropped_from_title" => Some(Self::DroppedFromTitle),
      "dropped_from_backend" => Some(Self::DroppedFromBackend),
      _ => None,
    }
  }
}

impl fmt::Display for AlertKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::DroppedFromTitle => "DROPPED FROM TITLE",
      Self::DroppedFromBackend => "DROPPED FROM BACKEND",
    })
  }
}

/// A placement regression. Never removed or edited once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
  pub keyword: String,
  pub kind:    AlertKind,
  pub week:    u8,
}

// ─── TrackedKeyword ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedKeyword {
  rank:       usize,
  keyword:    String,
  history:    Vec<WeeklyMetric>,
  in_title:   bool,
  in_backend: bool,
}

impl TrackedKeyword {
  /// Rebuild a keyword from persisted parts. Week ordering is validated by
  /// [`KeywordLedger::restore`].
  pub fn restore(
    rank: usize,
    keyword: String,
    in_title: bool,
    in_backend: bool,
    history: Vec<WeeklyMetric>,
  ) -> Self {
    Self { rank, keyword, history, in_title, in_backend }
  }

  pub fn rank(&self) -> usize { self.rank }

  pub fn keyword(&self) -> &str { &self.keyword }

  /// Recorded weeks in order; `history()[i].week == i + 1`.
  pub fn history(&self) -> &[WeeklyMetric] { &self.history }

  pub fn week(&self, index: u8) -> Option<&WeeklyMetric> {
    self.history.get(usize::from(index).checked_sub(1)?)
  }

  pub fn latest(&self) -> Option<&WeeklyMetric> { self.history.last() }

  pub fn in_title(&self) -> bool { self.in_title }

  pub fn in_backend(&self) -> bool { self.in_backend }

  fn matches(&self, keyword: &str) -> bool { self.keyword.eq_ignore_ascii_case(keyword) }
}

// ─── Phase ───────────────────────────────────────────────────────────────────

/// Where a ledger is in its quarter lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum LedgerPhase {
  /// Created, keyword set not yet chosen.
  Locking,
  /// Keywords locked; `week` is the last recorded week (0 before the first
  /// append).
  Active { week: u8 },
  /// All thirteen weeks recorded. Read-only from here on.
  Complete,
}

// ─── KeywordLedger ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordLedger {
  asin:      String,
  quarter:   Quarter,
  sku:       Option<String>,
  locked:    bool,
  last_week: u8,
  keywords:  Vec<TrackedKeyword>,
  alerts:    Vec<Alert>,
}

impl KeywordLedger {
  /// A fresh, unlocked ledger.
  pub fn new(asin: impl Into<String>, quarter: Quarter, sku: Option<String>) -> Self {
    Self {
      asin: asin.into(),
      quarter,
      sku,
      locked: false,
      last_week: 0,
      keywords: Vec::new(),
      alerts: Vec::new(),
    }
  }

  /// Rebuild a locked ledger from persisted parts, checking every invariant a
  /// live ledger maintains: ranks run 1..=N in order, and every keyword has
  /// weeks 1..=`last_week` and nothing else.
  pub fn restore(
    asin: impl Into<String>,
    quarter: Quarter,
    sku: Option<String>,
    last_week: u8,
    mut keywords: Vec<TrackedKeyword>,
    alerts: Vec<Alert>,
  ) -> Result<Self> {
    if last_week > WEEKS_PER_QUARTER {
      return Err(Error::Corrupt(format!("{last_week} weeks recorded")));
    }

    keywords.sort_by_key(|k| k.rank);

    for (i, kw) in keywords.iter().enumerate() {
      if kw.rank != i + 1 {
        return Err(Error::Corrupt(format!(
          "expected rank {} but found {} for {:?}",
          i + 1,
          kw.rank,
          kw.keyword
        )));
      }
      for (j, m) in kw.history.iter().enumerate() {
        if usize::from(m.week) != j + 1 {
          return Err(Error::Corrupt(format!(
            "{:?} has W{:02} where W{:02} was expected",
            kw.keyword,
            m.week,
            j + 1
          )));
        }
      }
    }

    if let Some(kw) = keywords.iter().find(|k| k.history.len() != usize::from(last_week)) {
      return Err(Error::Corrupt(format!(
        "{:?} has {} weeks but the ledger has {last_week}",
        kw.keyword,
        kw.history.len()
      )));
    }

    Ok(Self {
      asin: asin.into(),
      quarter,
      sku,
      locked: true,
      last_week,
      keywords,
      alerts,
    })
  }

  pub fn asin(&self) -> &str { &self.asin }

  pub fn quarter(&self) -> Quarter { self.quarter }

  pub fn sku(&self) -> Option<&str> { self.sku.as_deref() }

  pub fn is_locked(&self) -> bool { self.locked }

  /// Keywords in rank order.
  pub fn keywords(&self) -> &[TrackedKeyword] { &self.keywords }

  pub fn keyword(&self, keyword: &str) -> Option<&TrackedKeyword> {
    self.keywords.iter().find(|k| k.matches(keyword))
  }

  pub fn alerts(&self) -> &[Alert] { &self.alerts }

  /// Alerts attached to one keyword, oldest first.
  pub fn alerts_for<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a Alert> + 'a {
    self.alerts.iter().filter(move |a| a.keyword.eq_ignore_ascii_case(keyword))
  }

  /// The last recorded week, or 0 if none has been recorded.
  pub fn last_recorded_week(&self) -> u8 { self.last_week }

  pub fn phase(&self) -> LedgerPhase {
    if !self.locked {
      LedgerPhase::Locking
    } else if self.last_week >= WEEKS_PER_QUARTER {
      LedgerPhase::Complete
    } else {
      LedgerPhase::Active { week: self.last_week }
    }
  }

  // ── Mutations ───────────────────────────────────────────────────────────

  /// Choose the top `n` keywords by search volume (descending, ties by
  /// keyword ascending) among those with nonzero volume, and assign ranks
  /// 1..=n. May succeed at most once per ledger.
  pub fn lock_keywords(
    &mut self,
    candidates: &HashMap<String, KeywordMetrics>,
    n: usize,
  ) -> Result<()> {
    if self.locked {
      return Err(Error::AlreadyLocked);
    }

    let mut eligible: Vec<(String, u64)> = fold_case(candidates)
      .into_values()
      .filter(|(_, m)| m.search_volume > 0)
      .map(|(keyword, m)| (keyword, m.search_volume))
      .collect();

    if eligible.len() < n {
      return Err(Error::InsufficientData { required: n, available: eligible.len() });
    }

    eligible.sort_by(|(ka, va), (kb, vb)| vb.cmp(va).then_with(|| ka.cmp(kb)));

    self.keywords = eligible
      .into_iter()
      .take(n)
      .enumerate()
      .map(|(i, (keyword, _))| TrackedKeyword {
        rank: i + 1,
        keyword,
        history: Vec::new(),
        in_title: false,
        in_backend: false,
      })
      .collect();
    self.locked = true;
    Ok(())
  }

  /// Append week `week` for every locked keyword. The week must directly
  /// follow the last recorded one. Keywords missing from `metrics` record
  /// zeros. Either every keyword gets the week or none does.
  pub fn append_week(
    &mut self,
    week: u8,
    metrics: &HashMap<String, KeywordMetrics>,
    thresholds: &Thresholds,
  ) -> Result<()> {
    if !self.locked {
      return Err(Error::NotLocked);
    }
    let expected = self.last_week + 1;
    if week != expected {
      return Err(Error::OutOfOrderWeek { expected, got: week });
    }
    if week > WEEKS_PER_QUARTER {
      return Err(Error::WeekOutOfRange(week));
    }

    let folded = fold_case(metrics);
    let computed: Vec<WeeklyMetric> = self
      .keywords
      .iter()
      .map(|kw| {
        let raw = folded
          .get(&kw.keyword.to_lowercase())
          .map(|(_, m)| *m)
          .unwrap_or_default();
        WeeklyMetric::compute(week, raw, thresholds)
      })
      .collect();

    for (kw, metric) in self.keywords.iter_mut().zip(computed) {
      kw.history.push(metric);
    }
    self.last_week = week;
    Ok(())
  }

  /// Update a keyword's placement flags. A flag going from present to absent
  /// records an alert for `week`; recoveries are silent. Returns the alerts
  /// recorded by this call.
  pub fn record_placement(
    &mut self,
    keyword: &str,
    in_title: bool,
    in_backend: bool,
    week: u8,
  ) -> Result<Vec<Alert>> {
    if !(1..=WEEKS_PER_QUARTER).contains(&week) {
      return Err(Error::WeekOutOfRange(week));
    }
    let kw = self
      .keywords
      .iter_mut()
      .find(|k| k.matches(keyword))
      .ok_or_else(|| Error::UnknownKeyword(keyword.to_owned()))?;

    let mut raised = Vec::new();
    if kw.in_title && !in_title {
      raised.push(Alert {
        keyword: kw.keyword.clone(),
        kind:    AlertKind::DroppedFromTitle,
        week,
      });
    }
    if kw.in_backend && !in_backend {
      raised.push(Alert {
        keyword: kw.keyword.clone(),
        kind:    AlertKind::DroppedFromBackend,
        week,
      });
    }
    kw.in_title = in_title;
    kw.in_backend = in_backend;

    self.alerts.extend(raised.iter().cloned());
    Ok(raised)
  }
}

/// Key metrics by lowercased keyword so report rows match tracked keywords
/// regardless of case. When two spellings collide the higher-volume entry
/// wins, then the lexically smaller spelling, so the result does not depend
/// on map iteration order.
fn fold_case(
  metrics: &HashMap<String, KeywordMetrics>,
) -> HashMap<String, (String, KeywordMetrics)> {
  let mut folded: HashMap<String, (String, KeywordMetrics)> = HashMap::new();
  for (keyword, m) in metrics {
    let key = keyword.to_lowercase();
    let replace = match folded.get(&key) {
      None => true,
      Some((existing, em)) => {
        m.search_volume > em.search_volume
          || (m.search_volume == em.search_volume && keyword < existing)
      }
    };
    if replace {
      folded.insert(key, (keyword.clone(), *m));
    }
  }
  folded
}
