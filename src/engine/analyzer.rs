//! Per-ticker analysis pipeline.
//!
//! implied move → VRP → liquidity → skew + sentiment → direction →
//! generate → score → rank → size
//!
//! Every step that stops the ticker from trading, and every candidate that
//! is dropped or sized at the floor, leaves a `Rejection` with a reason code.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analytics::{
    calculate_vrp, classify, implied_move_from_straddle, resolve_direction, skew_bias,
    LiquidityAssessment, SkewReading, VrpResult, VrpTier,
};
use crate::config::EngineConfig;
use crate::data::{Direction, HistoricalMove, LiquiditySnapshot, TickerInput};
use crate::error::{EngineError, EngineResult, ErrorKind};
use crate::risk::PositionSizer;
use crate::scoring::{rank, CompositeScorer};
use crate::strategy::{
    CandidateRejection, GenerationRequest, Strategy, StrategyGenerator, StrategyType,
};

/// Why a ticker or candidate did not produce a full-size trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    InsufficientData,
    InvalidData,
    OutOfRange,
    NoLiquidCandidates,
    NoStrikesAvailable,
    ConfigurationError,
    /// VRP ratio in the SKIP tier.
    VrpBelowThreshold,
    /// Sized at the contract floor for lack of edge or valid risk.
    LowConfidence,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientData => ErrorKind::InsufficientData.as_str(),
            Self::InvalidData => ErrorKind::InvalidData.as_str(),
            Self::OutOfRange => ErrorKind::OutOfRange.as_str(),
            Self::NoLiquidCandidates => ErrorKind::NoLiquidCandidates.as_str(),
            Self::NoStrikesAvailable => ErrorKind::NoStrikesAvailable.as_str(),
            Self::ConfigurationError => ErrorKind::ConfigurationError.as_str(),
            Self::VrpBelowThreshold => "VRP_BELOW_THRESHOLD",
            Self::LowConfidence => "LOW_CONFIDENCE",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::InsufficientData => ErrorKind::InsufficientData.describe(),
            Self::InvalidData => ErrorKind::InvalidData.describe(),
            Self::OutOfRange => ErrorKind::OutOfRange.describe(),
            Self::NoLiquidCandidates => ErrorKind::NoLiquidCandidates.describe(),
            Self::NoStrikesAvailable => ErrorKind::NoStrikesAvailable.describe(),
            Self::ConfigurationError => ErrorKind::ConfigurationError.describe(),
            Self::VrpBelowThreshold => "Options are not priced rich enough against past earnings moves",
            Self::LowConfidence => "Edge too small to size above the minimum position",
        }
    }
}

impl From<ErrorKind> for ReasonCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InsufficientData => Self::InsufficientData,
            ErrorKind::InvalidData => Self::InvalidData,
            ErrorKind::OutOfRange => Self::OutOfRange,
            ErrorKind::NoLiquidCandidates => Self::NoLiquidCandidates,
            ErrorKind::NoStrikesAvailable => Self::NoStrikesAvailable,
            ErrorKind::ConfigurationError => Self::ConfigurationError,
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub code: ReasonCode,
    pub message: String,
    /// The candidate this applies to; `None` for the whole ticker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyType>,
}

impl Rejection {
    pub fn new(code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            strategy: None,
        }
    }

    pub fn from_error(err: &EngineError) -> Self {
        Self::new(err.kind().into(), err.to_string())
    }

    pub fn for_strategy(mut self, strategy: StrategyType) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

impl From<&CandidateRejection> for Rejection {
    fn from(r: &CandidateRejection) -> Self {
        Rejection::new(r.kind.into(), r.reason.clone()).for_strategy(r.strategy)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "snake_case")]
pub enum Decision {
    Trade,
    NoTrade(Rejection),
}

/// Outcome of one ticker's analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerAnalysis {
    pub ticker: String,
    pub implied_move_pct: Option<f64>,
    pub vrp: Option<VrpResult>,
    pub liquidity: Option<LiquidityAssessment>,
    /// Present when the skew bias was derived from the chain.
    pub skew: Option<SkewReading>,
    pub skew_bias: Option<Direction>,
    pub sentiment: f64,
    pub direction: Option<Direction>,
    /// Ranked best first; every entry is scored and sized.
    pub strategies: Vec<Strategy>,
    pub rejections: Vec<Rejection>,
    pub decision: Decision,
}

impl TickerAnalysis {
    fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            implied_move_pct: None,
            vrp: None,
            liquidity: None,
            skew: None,
            skew_bias: None,
            sentiment: 0.0,
            direction: None,
            strategies: Vec::new(),
            rejections: Vec::new(),
            decision: Decision::Trade,
        }
    }

    fn no_trade(mut self, rejection: Rejection) -> Self {
        info!("{}: no trade ({}) {}", self.ticker, rejection.code, rejection.message);
        self.decision = Decision::NoTrade(rejection);
        self
    }

    pub fn is_trade(&self) -> bool {
        matches!(self.decision, Decision::Trade)
    }

    pub fn best(&self) -> Option<&Strategy> {
        self.strategies.first()
    }

    /// Reason the ticker did not trade, if it did not.
    pub fn reason(&self) -> Option<&Rejection> {
        match &self.decision {
            Decision::Trade => None,
            Decision::NoTrade(r) => Some(r),
        }
    }
}

/// Runs the full pipeline with one validated configuration.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    generator: StrategyGenerator,
    scorer: CompositeScorer,
    sizer: PositionSizer,
}

impl Engine {
    /// Validate `config` and build the components. Configuration errors
    /// surface here, before any ticker is analyzed.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let generator = StrategyGenerator::new(config.strategy.clone(), config.liquidity.clone());
        let scorer = CompositeScorer::new(config.scoring.clone(), config.sentiment.modifiers.clone());
        let sizer = PositionSizer::new(config.kelly.clone());
        Ok(Self {
            config,
            generator,
            scorer,
            sizer,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Analyze one ticker. Never fails: problems become a `NoTrade` decision.
    pub fn analyze_ticker(&self, input: &TickerInput) -> TickerAnalysis {
        let mut analysis = TickerAnalysis::new(&input.ticker);

        if !input.price.is_positive() {
            let err = EngineError::invalid(format!("stock price must be positive, got {}", input.price));
            return analysis.no_trade(Rejection::from_error(&err));
        }

        let implied_move_pct = match input.implied_move_pct {
            Some(pct) => pct,
            None => match implied_move_from_straddle(&input.price, &input.chain) {
                Ok(m) => {
                    debug!("{}: implied move {:.2}% from {} straddle", input.ticker, m.implied_move_pct, m.atm_strike);
                    m.implied_move_pct
                }
                Err(err) => return analysis.no_trade(Rejection::from_error(&err)),
            },
        };
        analysis.implied_move_pct = Some(implied_move_pct);

        let magnitudes = HistoricalMove::magnitudes(&input.historical_moves);
        let vrp = match calculate_vrp(implied_move_pct, &magnitudes, &self.config.vrp) {
            Ok(vrp) => vrp,
            Err(err) => return analysis.no_trade(Rejection::from_error(&err)),
        };
        analysis.vrp = Some(vrp.clone());

        if vrp.tier == VrpTier::Skip && self.config.vrp.skip_blocks_trade {
            let message = format!(
                "VRP ratio {:.2} is below the marginal threshold {:.2}",
                vrp.ratio, self.config.vrp.marginal
            );
            return analysis.no_trade(Rejection::new(ReasonCode::VrpBelowThreshold, message));
        }

        let snapshot = match input.liquidity {
            Some(snapshot) => snapshot,
            None => match atm_snapshot(input) {
                Some(snapshot) => snapshot,
                None => {
                    let err = EngineError::NoStrikesAvailable(format!(
                        "{} chain has no quotes to measure liquidity",
                        input.ticker
                    ));
                    return analysis.no_trade(Rejection::from_error(&err));
                }
            },
        };
        let liquidity = classify(
            &snapshot,
            self.config.liquidity.intended_contracts,
            &self.config.liquidity,
        );
        analysis.liquidity = Some(liquidity);

        let sentiment = input.sentiment_score();
        analysis.sentiment = sentiment;

        let bias = match input.skew_bias {
            Some(bias) => bias,
            None => match skew_bias(
                &input.price,
                &input.chain,
                implied_move_pct,
                &self.config.sentiment.skew,
            ) {
                Ok(reading) => {
                    let bias = reading.bias;
                    analysis.skew = Some(reading);
                    bias
                }
                Err(err) => {
                    warn!("{}: skew unavailable ({}), treating as neutral", input.ticker, err);
                    Direction::Neutral
                }
            },
        };
        analysis.skew_bias = Some(bias);

        let direction = resolve_direction(bias, sentiment, &self.config.sentiment.direction);
        analysis.direction = Some(direction);

        let request = GenerationRequest {
            ticker: &input.ticker,
            price: &input.price,
            chain: &input.chain,
            implied_move_pct,
            direction,
            liquidity_tier: liquidity.tier,
            expiration: input.expiration,
        };
        let generation = self.generator.generate(&request);
        analysis
            .rejections
            .extend(generation.rejections.iter().map(Rejection::from));

        if let Some(kind) = generation.empty_reason() {
            let message = summarize_rejections(&analysis.rejections)
                .unwrap_or_else(|| format!("no {} strategy could be built", direction.as_str()));
            return analysis.no_trade(Rejection::new(kind.into(), message));
        }

        let mut candidates = generation.candidates;
        self.scorer.score_all(&mut candidates, &vrp, sentiment);
        rank(&mut candidates);

        for mut strategy in candidates {
            match self.sizer.size_strategy(&strategy) {
                Ok(sizing) => {
                    if sizing.is_low_confidence() {
                        analysis.rejections.push(
                            Rejection::new(
                                ReasonCode::LowConfidence,
                                format!(
                                    "{} {} edge {:.3}, sized at {} contract(s)",
                                    strategy.kind(),
                                    strategy.strikes_label(),
                                    sizing.edge,
                                    sizing.contracts
                                ),
                            )
                            .for_strategy(strategy.kind()),
                        );
                    }
                    strategy.sizing = Some(sizing);
                    analysis.strategies.push(strategy);
                }
                Err(err) => {
                    warn!("{}: dropping {} ({})", input.ticker, strategy.kind(), err);
                    analysis
                        .rejections
                        .push(Rejection::from_error(&err).for_strategy(strategy.kind()));
                }
            }
        }

        if analysis.strategies.is_empty() {
            let rejection = analysis
                .rejections
                .last()
                .cloned()
                .unwrap_or_else(|| Rejection::new(ReasonCode::NoStrikesAvailable, "no sized strategy"));
            return analysis.no_trade(Rejection {
                strategy: None,
                ..rejection
            });
        }

        if let Some(best) = analysis.best() {
            info!(
                "{}: {} {} {} score {:.1}, POP {:.1}%, {} contract(s)",
                analysis.ticker,
                direction.as_str(),
                best.kind(),
                best.strikes_label(),
                best.total_score(),
                best.probability_of_profit * 100.0,
                best.contracts()
            );
        }
        analysis
    }
}

/// Worst of the quotes nearest the price on each side.
fn atm_snapshot(input: &TickerInput) -> Option<LiquiditySnapshot> {
    let price = input.price.amount;
    let call = input.chain.calls().nearest(price);
    let put = input.chain.puts().nearest(price);
    LiquiditySnapshot::worst_of(call.into_iter().chain(put))
}

fn summarize_rejections(rejections: &[Rejection]) -> Option<String> {
    if rejections.is_empty() {
        return None;
    }
    Some(
        rejections
            .iter()
            .map(|r| r.message.as_str())
            .collect::<Vec<_>>()
            .join("; "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{LiquidityTier, RejectPolicy};
    use crate::data::{Money, OptionChain, OptionQuote, OptionType, SentimentSignal};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 19).unwrap()
    }

    fn chain() -> OptionChain {
        let q = |t, k: Decimal, bid: Decimal, iv: f64| {
            OptionQuote::new(t, Money::usd(k), Money::usd(bid), Money::usd(bid + dec!(0.02)), 2_000)
                .with_iv(iv)
        };
        OptionChain::from_quotes(
            expiry(),
            vec![
                q(OptionType::Put, dec!(85), dec!(0.20), 0.70),
                q(OptionType::Put, dec!(90), dec!(0.70), 0.65),
                q(OptionType::Put, dec!(92.5), dec!(1.20), 0.62),
                q(OptionType::Put, dec!(95), dec!(2.00), 0.60),
                q(OptionType::Put, dec!(100), dec!(4.50), 0.55),
                q(OptionType::Call, dec!(100), dec!(4.50), 0.55),
                q(OptionType::Call, dec!(105), dec!(2.00), 0.50),
                q(OptionType::Call, dec!(107.5), dec!(1.20), 0.50),
                q(OptionType::Call, dec!(110), dec!(0.70), 0.50),
                q(OptionType::Call, dec!(115), dec!(0.20), 0.50),
            ],
        )
        .unwrap()
    }

    fn history() -> Vec<(NaiveDate, f64)> {
        [1.0, -1.2, 0.8, -1.0, 1.1, -0.9]
            .iter()
            .enumerate()
            .map(|(i, m)| (NaiveDate::from_ymd_opt(2020 + i as i32, 4, 20).unwrap(), *m))
            .collect()
    }

    fn input() -> TickerInput {
        TickerInput::new("ACME", Money::usd(dec!(100)), chain())
            .with_implied_move(8.0)
            .with_history(history())
            .with_liquidity(LiquiditySnapshot::new(5_000, 4.0))
            .with_skew_bias(Direction::Bullish)
    }

    fn engine() -> Engine {
        Engine::new(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_bullish_ticker_trades() {
        let analysis = engine().analyze_ticker(&input());
        assert!(analysis.is_trade(), "{:?}", analysis.decision);
        assert_eq!(analysis.direction, Some(Direction::Bullish));
        assert_eq!(analysis.vrp.as_ref().unwrap().tier, VrpTier::Excellent);
        assert_eq!(analysis.liquidity.unwrap().tier, LiquidityTier::Excellent);

        let best = analysis.best().unwrap();
        assert_eq!(best.kind(), StrategyType::BullPutSpread);
        assert!(best.score.is_some());
        assert!(best.contracts() >= 1);
    }

    #[test]
    fn test_invalid_config_fails_at_startup() {
        let mut config = EngineConfig::default();
        config.vrp.good = config.vrp.excellent;
        let err = Engine::new(config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    }

    #[test]
    fn test_short_history_is_insufficient_data() {
        let mut input = input();
        input.historical_moves.truncate(3);
        let analysis = engine().analyze_ticker(&input);
        assert_eq!(analysis.reason().unwrap().code, ReasonCode::InsufficientData);
        assert!(analysis.strategies.is_empty());
    }

    #[test]
    fn test_skip_tier_blocks_trade() {
        let input = input().with_implied_move(1.0);
        let analysis = engine().analyze_ticker(&input);
        assert_eq!(analysis.vrp.as_ref().unwrap().tier, VrpTier::Skip);
        assert_eq!(analysis.reason().unwrap().code, ReasonCode::VrpBelowThreshold);
    }

    #[test]
    fn test_non_positive_price_is_invalid_data() {
        let mut input = input();
        input.price = Money::usd(dec!(0));
        let analysis = engine().analyze_ticker(&input);
        assert_eq!(analysis.reason().unwrap().code, ReasonCode::InvalidData);
    }

    #[test]
    fn test_expiration_mismatch_reports_invalid_data() {
        let mut input = input();
        input.expiration = NaiveDate::from_ymd_opt(2024, 8, 16).unwrap();
        let analysis = engine().analyze_ticker(&input);
        assert!(analysis.strategies.is_empty());
        let reason = analysis.reason().unwrap();
        assert_eq!(reason.code, ReasonCode::InvalidData);
        assert!(reason.message.contains("2024-08-16"), "{}", reason.message);
    }

    #[test]
    fn test_illiquid_ticker_reports_no_liquid_candidates() {
        let input = input().with_liquidity(LiquiditySnapshot::new(5, 30.0));
        let analysis = engine().analyze_ticker(&input);
        assert_eq!(analysis.liquidity.unwrap().tier, LiquidityTier::Reject);
        let reason = analysis.reason().unwrap();
        assert_eq!(reason.code, ReasonCode::NoLiquidCandidates);
        assert!(!reason.message.is_empty());
    }

    #[test]
    fn test_penalize_policy_trades_reduced() {
        let mut config = EngineConfig::default();
        config.liquidity.reject_policy = RejectPolicy::Penalize;
        let engine = Engine::new(config).unwrap();
        let input = input().with_liquidity(LiquiditySnapshot::new(5, 30.0));

        let analysis = engine.analyze_ticker(&input);
        assert!(analysis.is_trade());
        let best = analysis.best().unwrap();
        assert!(best.reduced_sizing);
        assert_eq!(best.score.as_ref().unwrap().liquidity_points, 0.0);
    }

    #[test]
    fn test_conflicting_sentiment_goes_neutral() {
        let input = input().with_sentiment(SentimentSignal::new(-0.5));
        let analysis = engine().analyze_ticker(&input);
        assert_eq!(analysis.direction, Some(Direction::Neutral));
        assert!(analysis.is_trade());
        let kinds: Vec<StrategyType> = analysis.strategies.iter().map(|s| s.kind()).collect();
        assert!(kinds.iter().all(|k| k.is_two_sided()));
        assert!(analysis
            .strategies
            .windows(2)
            .all(|w| w[0].total_score() >= w[1].total_score()));
    }

    #[test]
    fn test_derived_signals() {
        // No implied move, liquidity or skew supplied
        let mut input = input();
        input.implied_move_pct = None;
        input.liquidity = None;
        input.skew_bias = None;

        let analysis = engine().analyze_ticker(&input);
        // 4.51 + 4.51 straddle mid on a 100 stock
        assert!((analysis.implied_move_pct.unwrap() - 9.02).abs() < 1e-9);
        // Puts carry richer IV than calls
        assert_eq!(analysis.skew.as_ref().unwrap().bias, Direction::Bearish);
        assert_eq!(analysis.skew_bias, Some(Direction::Bearish));
        assert!(analysis.liquidity.is_some());
    }

    #[test]
    fn test_reason_codes_serialize_screaming() {
        let json = serde_json::to_string(&ReasonCode::VrpBelowThreshold).unwrap();
        assert_eq!(json, "\"VRP_BELOW_THRESHOLD\"");
        assert_eq!(ReasonCode::from(ErrorKind::OutOfRange).as_str(), "OUT_OF_RANGE");
    }
}
