//! # Cogverse Observer
//!
//! Rolling-window detector for emergent behavior.
//!
//! Every sample condenses the population into four proxy levels (memory
//! salience, cultural innovation, abstraction and social reach) and one
//! diversity figure, the mean of the normalized Shannon entropies of the
//! action histogram and of the brain-complexity histogram. A proxy's score is
//! its level times the diversity. The window is split in an older and a newer
//! half; a signal is raised when the newer half's mean score reaches the
//! detection threshold and its relative increase over the older half reaches
//! the novelty threshold.

use cogverse_core::config::{ConsciousnessMetricsConfig, EmergenceConfig, ObserverConfig};
use cogverse_data::{ActionKind, EmergenceSample, MemorySummary, Signal};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Buckets of the brain-complexity histogram.
pub const COMPLEXITY_BUCKETS: usize = 10;

/// What the observer needs to know about one agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentObservation {
    pub action: ActionKind,
    pub complexity: f64,
    pub mean_abs_weight: f64,
    pub energy_ratio: f64,
    pub memory: MemorySummary,
    pub social_interactions: u64,
}

/// A raised signal kept in the event history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub tick: u64,
    pub signal: Signal,
    pub score: f64,
    pub novelty: f64,
}

/// Level of a proxy in a sample, before weighting by diversity.
pub fn level(sample: &EmergenceSample, signal: Signal) -> f64 {
    match signal {
        Signal::SelfAwareness => sample.memory_salience,
        Signal::Creativity => sample.cultural_innovation,
        Signal::Abstraction => sample.abstraction,
        Signal::TheoryOfMind => sample.social_reach,
    }
}

pub fn score(sample: &EmergenceSample, signal: Signal) -> f64 {
    level(sample, signal) * sample.diversity
}

/// Shannon entropy of `counts`, normalized by `ln(categories)`.
pub fn normalized_entropy(counts: &[usize], categories: usize) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 || categories < 2 {
        return 0.0;
    }
    let h: f64 = counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            -p * p.ln()
        })
        .sum();
    (h / (categories as f64).ln()).clamp(0.0, 1.0)
}

fn mean<I: Iterator<Item = f64>>(values: I) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn diversity(agents: &[AgentObservation]) -> f64 {
    if agents.is_empty() {
        return 0.0;
    }
    let mut actions = [0usize; ActionKind::ALL.len()];
    for a in agents {
        if let Some(i) = ActionKind::ALL.iter().position(|k| *k == a.action) {
            actions[i] += 1;
        }
    }

    let lo = agents.iter().map(|a| a.complexity).fold(f64::INFINITY, f64::min);
    let hi = agents.iter().map(|a| a.complexity).fold(f64::NEG_INFINITY, f64::max);
    let mut buckets = [0usize; COMPLEXITY_BUCKETS];
    for a in agents {
        let idx = if hi > lo {
            (((a.complexity - lo) / (hi - lo)) * COMPLEXITY_BUCKETS as f64) as usize
        } else {
            0
        };
        buckets[idx.min(COMPLEXITY_BUCKETS - 1)] += 1;
    }

    0.5 * normalized_entropy(&actions, ActionKind::ALL.len())
        + 0.5 * normalized_entropy(&buckets, COMPLEXITY_BUCKETS)
}

/// Condenses the population at `tick` into a sample.
pub fn summarize(tick: u64, agents: &[AgentObservation], innovation_share: f64) -> EmergenceSample {
    EmergenceSample {
        tick,
        population: agents.len(),
        mean_complexity: mean(agents.iter().map(|a| a.complexity)),
        mean_energy: mean(agents.iter().map(|a| a.energy_ratio)),
        diversity: diversity(agents),
        memory_salience: mean(
            agents
                .iter()
                .map(|a| 0.5 * a.memory.long_term_fill + 0.5 * a.memory.mean_importance),
        ),
        cultural_innovation: innovation_share.clamp(0.0, 1.0),
        abstraction: mean(agents.iter().map(|a| a.mean_abs_weight.clamp(0.0, 1.0))),
        social_reach: mean(
            agents
                .iter()
                .map(|a| if a.social_interactions > 0 { 1.0 } else { 0.0 }),
        ),
        signals: BTreeSet::new(),
    }
}

fn enabled(metrics: &ConsciousnessMetricsConfig, signal: Signal) -> bool {
    match signal {
        Signal::SelfAwareness => metrics.self_awareness,
        Signal::Creativity => metrics.creativity,
        Signal::Abstraction => metrics.abstraction,
        Signal::TheoryOfMind => metrics.theory_of_mind,
    }
}

pub struct EmergenceObserver {
    window: VecDeque<EmergenceSample>,
    capacity: usize,
    detection_threshold: f64,
    novelty_threshold: f64,
    metrics: ConsciousnessMetricsConfig,
    sample_interval: u64,
    collecting: bool,
    history: VecDeque<SignalEvent>,
    max_events: usize,
}

impl EmergenceObserver {
    pub fn new(emergence: &EmergenceConfig, observer: &ObserverConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(emergence.pattern_window),
            capacity: emergence.pattern_window.max(1),
            detection_threshold: emergence.detection_threshold,
            novelty_threshold: emergence.novelty_threshold,
            metrics: observer.consciousness_metrics.clone(),
            sample_interval: observer.data_collection.interval.max(1),
            collecting: observer.data_collection.enabled,
            history: VecDeque::new(),
            max_events: observer.max_events,
        }
    }

    /// Whether a sample is due at `tick`.
    pub fn should_sample(&self, tick: u64) -> bool {
        self.collecting && tick % self.sample_interval == 0
    }

    /// Appends a sample, evicting the oldest beyond the window size, and runs
    /// detection. Returns the signals raised by this sample.
    pub fn sample(&mut self, sample: EmergenceSample) -> BTreeSet<Signal> {
        if self.window.len() == self.capacity {
            self.window.pop_front();
        }
        self.window.push_back(sample);

        let raised = self.detect_pattern();
        let tick = self.window.back().map_or(0, |s| s.tick);
        if let Some(latest) = self.window.back_mut() {
            latest.signals = raised.iter().map(|(s, _, _)| *s).collect();
        }
        for (signal, current, novelty) in &raised {
            tracing::info!(
                tick,
                signal = %signal,
                score = current,
                novelty,
                "Emergence signal"
            );
            if self.max_events > 0 {
                if self.history.len() == self.max_events {
                    self.history.pop_front();
                }
                self.history.push_back(SignalEvent {
                    tick,
                    signal: *signal,
                    score: *current,
                    novelty: *novelty,
                });
            }
        }
        raised.into_iter().map(|(s, _, _)| s).collect()
    }

    /// Signals whose newer-half score clears both thresholds, with the
    /// current score and novelty of each.
    pub fn detect_pattern(&self) -> Vec<(Signal, f64, f64)> {
        let n = self.window.len();
        if n < 2 {
            return Vec::new();
        }
        let split = n / 2;
        Signal::ALL
            .iter()
            .filter(|s| enabled(&self.metrics, **s))
            .filter_map(|&signal| {
                let baseline = mean(self.window.iter().take(split).map(|x| score(x, signal)));
                let current = mean(self.window.iter().skip(split).map(|x| score(x, signal)));
                let novelty = if current > 0.0 {
                    ((current - baseline) / current).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                (current >= self.detection_threshold && novelty >= self.novelty_threshold)
                    .then_some((signal, current, novelty))
            })
            .collect()
    }

    pub fn window(&self) -> &VecDeque<EmergenceSample> {
        &self.window
    }

    pub fn latest(&self) -> Option<&EmergenceSample> {
        self.window.back()
    }

    pub fn history(&self) -> &VecDeque<SignalEvent> {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observer(window: usize) -> EmergenceObserver {
        let emergence = EmergenceConfig {
            pattern_window: window,
            detection_threshold: 0.3,
            novelty_threshold: 0.5,
        };
        EmergenceObserver::new(&emergence, &ObserverConfig::default())
    }

    fn sample(tick: u64, diversity: f64, innovation: f64) -> EmergenceSample {
        EmergenceSample {
            tick,
            population: 10,
            diversity,
            cultural_innovation: innovation,
            ..Default::default()
        }
    }

    fn agent(action: ActionKind, complexity: f64) -> AgentObservation {
        AgentObservation {
            action,
            complexity,
            mean_abs_weight: 0.4,
            energy_ratio: 0.5,
            memory: MemorySummary::default(),
            social_interactions: 0,
        }
    }

    #[test]
    fn test_entropy_bounds() {
        assert_eq!(normalized_entropy(&[5, 0, 0], 3), 0.0);
        assert!((normalized_entropy(&[2, 2, 2], 3) - 1.0).abs() < 1e-12);
        assert_eq!(normalized_entropy(&[], 3), 0.0);
    }

    #[test]
    fn test_uniform_population_has_no_diversity() {
        let agents = vec![agent(ActionKind::Move, 1.0); 5];
        let s = summarize(0, &agents, 0.0);
        assert_eq!(s.diversity, 0.0);
        assert_eq!(s.population, 5);
        assert!((s.abstraction - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_varied_population_is_diverse() {
        let agents: Vec<AgentObservation> = ActionKind::ALL
            .iter()
            .enumerate()
            .map(|(i, k)| agent(*k, i as f64))
            .collect();
        let s = summarize(0, &agents, 0.0);
        assert!(s.diversity > 0.8);
    }

    #[test]
    fn test_single_sample_raises_nothing() {
        let mut obs = observer(10);
        assert!(obs.sample(sample(0, 1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_rising_score_raises_signal() {
        let mut obs = observer(4);
        obs.sample(sample(0, 1.0, 0.0));
        obs.sample(sample(10, 1.0, 0.0));
        obs.sample(sample(20, 1.0, 0.9));
        let raised = obs.sample(sample(30, 1.0, 0.9));
        assert!(raised.contains(&Signal::Creativity));
        assert!(!raised.contains(&Signal::Abstraction));
        assert_eq!(obs.history().len(), 2);
        assert_eq!(obs.history().back().map(|e| e.tick), Some(30));
        assert!(obs.latest().unwrap().signals.contains(&Signal::Creativity));
    }

    #[test]
    fn test_flat_high_score_is_not_novel() {
        let mut obs = observer(4);
        for t in 0..4 {
            obs.sample(sample(t, 1.0, 0.9));
        }
        assert!(obs.detect_pattern().is_empty());
    }

    #[test]
    fn test_disabled_proxy_is_never_raised() {
        let mut config = ObserverConfig::default();
        config.consciousness_metrics.creativity = false;
        let emergence = EmergenceConfig {
            pattern_window: 4,
            detection_threshold: 0.3,
            novelty_threshold: 0.5,
        };
        let mut obs = EmergenceObserver::new(&emergence, &config);
        obs.sample(sample(0, 1.0, 0.0));
        let raised = obs.sample(sample(1, 1.0, 0.9));
        assert!(raised.is_empty());
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut obs = observer(3);
        for t in 0..5 {
            obs.sample(sample(t, 0.0, 0.0));
        }
        assert_eq!(obs.window().len(), 3);
        assert_eq!(obs.window().front().map(|s| s.tick), Some(2));
    }

    #[test]
    fn test_history_is_bounded() {
        let emergence = EmergenceConfig {
            pattern_window: 2,
            detection_threshold: 0.1,
            novelty_threshold: 0.1,
        };
        let config = ObserverConfig {
            max_events: 2,
            ..Default::default()
        };
        let mut obs = EmergenceObserver::new(&emergence, &config);
        for t in 0..10 {
            let level = if t % 2 == 0 { 0.0 } else { 1.0 };
            obs.sample(sample(t, 1.0, level));
        }
        assert_eq!(obs.history().len(), 2);
    }

    #[test]
    fn test_sampling_interval() {
        let obs = observer(4);
        assert!(obs.should_sample(0));
        assert!(!obs.should_sample(5));
        assert!(obs.should_sample(10));
    }
}
