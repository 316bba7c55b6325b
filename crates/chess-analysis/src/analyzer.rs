//! Single-shot and streamed position evaluation.
//!
//! Every request gets a fresh engine process. The [`Analyzer`] validates the
//! position, spawns a session, drives the search and always shuts the
//! session down before returning.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::aggregate::SearchAggregator;
use crate::config::{EVALUATE_DEPTH, MULTI_PV, STREAM_DEPTH};
use crate::normalize::normalize;
use crate::session::{EngineProcess, EngineSession, SearchEvent, SearchRequest};
use crate::{AnalysisError, EngineConfig, Evaluation, Position, StreamEvent};

/// Anything that can turn a position into an evaluation.
///
/// Game analysis depends on this rather than on [`Analyzer`] so it can be
/// exercised without an engine.
pub trait PositionEvaluator {
    fn evaluate(
        &self,
        fen: &str,
        depth: u32,
    ) -> impl Future<Output = Result<Evaluation, AnalysisError>> + Send;
}

/// How a streamed evaluation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Final evaluation and `done` were delivered.
    Completed,
    /// An error event was delivered.
    Failed,
    /// The consumer went away before the search finished.
    Cancelled,
}

/// Stockfish-backed evaluator.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: EngineConfig,
}

impl Analyzer {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate one position and return scores from White's point of view.
    ///
    /// The FEN is validated before any process is spawned.
    pub async fn evaluate(&self, fen: &str, depth: u32) -> Result<Evaluation, AnalysisError> {
        let request = single_request(fen, depth)?;

        let mut session = EngineSession::spawn(&self.config, self.config.timeout)?;
        let result = search(&mut session, &request).await;
        session.shutdown().await;

        let evaluation = result?;
        debug!(
            best_move = %evaluation.best_move,
            depth = evaluation.depth,
            "evaluation complete"
        );
        Ok(normalize(evaluation, fen))
    }

    /// Evaluate one position, reporting every deeper primary line to `tx`.
    ///
    /// The channel receives strictly deeper partial evaluations, then the
    /// final evaluation and `done`, or a single error. Dropping the
    /// receiver cancels the search.
    pub async fn stream(
        &self,
        fen: &str,
        depth: u32,
        tx: mpsc::Sender<StreamEvent>,
    ) -> StreamOutcome {
        let request = match stream_request(fen, depth) {
            Ok(request) => request,
            Err(e) => return fail(&tx, e).await,
        };

        match EngineSession::spawn(&self.config, self.config.stream_timeout) {
            Ok(session) => stream_search(session, request, tx).await,
            Err(e) => fail(&tx, e).await,
        }
    }
}

impl PositionEvaluator for Analyzer {
    fn evaluate(
        &self,
        fen: &str,
        depth: u32,
    ) -> impl Future<Output = Result<Evaluation, AnalysisError>> + Send {
        Analyzer::evaluate(self, fen, depth)
    }
}

/// Validated single-shot search with the depth clamped into range.
fn single_request(fen: &str, depth: u32) -> Result<SearchRequest, AnalysisError> {
    Position::parse(fen)?;
    Ok(SearchRequest {
        fen: fen.to_string(),
        depth: EVALUATE_DEPTH.clamp(Some(depth.into())),
        multipv: MULTI_PV,
    })
}

/// Validated streamed search; its depth ceiling is lower.
fn stream_request(fen: &str, depth: u32) -> Result<SearchRequest, AnalysisError> {
    Position::parse(fen)?;
    Ok(SearchRequest {
        fen: fen.to_string(),
        depth: STREAM_DEPTH.clamp(Some(depth.into())),
        multipv: MULTI_PV,
    })
}

/// Drive a session from handshake to `bestmove`.
///
/// Scores are left side-relative.
pub(crate) async fn search<R, W, P>(
    session: &mut EngineSession<R, W, P>,
    request: &SearchRequest,
) -> Result<Evaluation, AnalysisError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    P: EngineProcess,
{
    session.start(request).await?;
    let mut aggregator = SearchAggregator::new(request.depth);

    loop {
        match session.next_event().await? {
            SearchEvent::Info(info) => aggregator.apply(&info),
            SearchEvent::BestMove(mv) => return Ok(aggregator.finish(&mv)),
        }
    }
}

/// Streaming counterpart of [`search`] that owns its session.
pub(crate) async fn stream_search<R, W, P>(
    mut session: EngineSession<R, W, P>,
    request: SearchRequest,
    tx: mpsc::Sender<StreamEvent>,
) -> StreamOutcome
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    P: EngineProcess,
{
    let fen = request.fen.as_str();

    let started = tokio::select! {
        _ = tx.closed() => None,
        started = session.start(&request) => Some(started),
    };
    let outcome = match started {
        None => StreamOutcome::Cancelled,
        Some(Err(e)) => fail(&tx, e).await,
        Some(Ok(())) => {
            let mut aggregator = SearchAggregator::new(request.depth);
            loop {
                let event = tokio::select! {
                    _ = tx.closed() => break StreamOutcome::Cancelled,
                    event = session.next_event() => event,
                };

                match event {
                    Ok(SearchEvent::Info(info)) => {
                        aggregator.apply(&info);
                        if let Some(progress) = aggregator.take_progress() {
                            let update = StreamEvent::Evaluation {
                                evaluation: normalize(progress, fen),
                            };
                            if tx.send(update).await.is_err() {
                                break StreamOutcome::Cancelled;
                            }
                        }
                    }
                    Ok(SearchEvent::BestMove(mv)) => {
                        let last = StreamEvent::Evaluation {
                            evaluation: normalize(aggregator.finish(&mv), fen),
                        };
                        if tx.send(last).await.is_err() || tx.send(StreamEvent::done()).await.is_err() {
                            break StreamOutcome::Cancelled;
                        }
                        break StreamOutcome::Completed;
                    }
                    Err(e) => break fail(&tx, e).await,
                }
            }
        }
    };

    if outcome == StreamOutcome::Cancelled {
        info!("stream consumer disconnected, stopping engine");
    }
    session.shutdown().await;
    outcome
}

async fn fail(tx: &mpsc::Sender<StreamEvent>, error: AnalysisError) -> StreamOutcome {
    warn!(error = %error, "streamed evaluation failed");
    let event = StreamEvent::Error {
        error: error.client_message(),
    };
    match tx.send(event).await {
        Ok(()) => StreamOutcome::Failed,
        Err(_) => StreamOutcome::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::{fake_session, Script};
    use crate::Score;
    use std::time::Duration;
    use uci::{GuiCommand, InfoBuilder};

    const BLACK_TO_MOVE: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";

    fn request(depth: u32) -> SearchRequest {
        SearchRequest {
            fen: BLACK_TO_MOVE.to_string(),
            depth,
            multipv: MULTI_PV,
        }
    }

    fn info(depth: u32, rank: u32, cp: i32, pv: &[&str]) -> String {
        InfoBuilder::new()
            .depth(depth)
            .multipv(rank)
            .score_cp(cp)
            .pv(pv.iter().copied())
            .build()
            .to_uci()
    }

    fn deepening_search() -> Script {
        Script::search(
            vec![
                "info string NNUE evaluation enabled".to_string(),
                info(5, 1, -20, &["e7e5", "g1f3"]),
                info(5, 2, -35, &["c7c5"]),
                "info depth 6 currmove e7e5 currmovenumber 1".to_string(),
                info(6, 1, -25, &["e7e5", "g1f3", "b8c6"]),
                info(6, 2, -30, &["c7c5", "g1f3"]),
                info(6, 3, -41, &["e7e6"]),
            ],
            "e7e5 ponder g1f3",
        )
    }

    async fn collect(mut rx: mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_search_aggregates_multipv() {
        let (mut session, _kills, _) = fake_session(deepening_search(), Duration::from_secs(5));
        let eval = search(&mut session, &request(6)).await.unwrap();

        assert_eq!(eval.best_move, "e7e5");
        assert_eq!(eval.depth, 6);
        assert_eq!(eval.score, Some(Score::cp(-25)));
        assert_eq!(eval.pv, vec!["e7e5", "g1f3", "b8c6"]);
        let moves: Vec<&str> = eval.lines.iter().map(|l| l.mv.as_str()).collect();
        assert_eq!(moves, vec!["e7e5", "c7c5", "e7e6"]);
    }

    #[tokio::test]
    async fn test_stream_emits_progress_then_final_then_done() {
        let (session, kills, _) = fake_session(deepening_search(), Duration::from_secs(5));
        let (tx, rx) = mpsc::channel(16);

        let outcome = stream_search(session, request(6), tx).await;
        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(kills.count(), 1);

        let events = collect(rx).await;
        assert_eq!(events.len(), 4);

        let depths: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Evaluation { evaluation } => Some(evaluation.depth),
                _ => None,
            })
            .collect();
        assert_eq!(depths, vec![5, 6, 6]);

        // Black to move: engine scores are flipped to White's view.
        match &events[0] {
            StreamEvent::Evaluation { evaluation } => {
                assert_eq!(evaluation.score, Some(Score::cp(20)));
                assert_eq!(evaluation.best_move, "e7e5");
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match &events[2] {
            StreamEvent::Evaluation { evaluation } => {
                assert_eq!(evaluation.score, Some(Score::cp(25)));
                assert_eq!(evaluation.lines.len(), 3);
                assert_eq!(evaluation.lines[2].score, Some(Score::cp(41)));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(events[3], StreamEvent::done());
    }

    #[tokio::test]
    async fn test_stream_timeout_sends_single_error() {
        let (session, kills, _) = fake_session(Script::Hang, Duration::from_millis(150));
        let (tx, rx) = mpsc::channel(16);

        let outcome = stream_search(session, request(12), tx).await;
        assert_eq!(outcome, StreamOutcome::Failed);
        assert_eq!(kills.count(), 1);

        let events = collect(rx).await;
        assert_eq!(
            events,
            vec![StreamEvent::Error {
                error: "Stockfish analysis timed out".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_stream_engine_crash_is_error() {
        let (session, kills, _) =
            fake_session(Script::ExitAfterIdentify, Duration::from_secs(5));
        let (tx, rx) = mpsc::channel(16);

        let outcome = stream_search(session, request(12), tx).await;
        assert_eq!(outcome, StreamOutcome::Failed);
        assert_eq!(kills.count(), 1);

        let events = collect(rx).await;
        assert_eq!(events.len(), 1);
        assert!(events[0].is_terminal());
        assert!(matches!(events[0], StreamEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_stream_cancelled_when_consumer_leaves() {
        let (session, kills, _) = fake_session(Script::Hang, Duration::from_secs(5));
        let (tx, rx) = mpsc::channel(16);

        let task = tokio::spawn(stream_search(session, request(12), tx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(rx);

        let outcome = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, StreamOutcome::Cancelled);
        assert_eq!(kills.count(), 1);
    }

    fn go_depths(commands: &[GuiCommand]) -> Vec<u32> {
        commands
            .iter()
            .filter_map(|c| match c {
                GuiCommand::Go(opts) => opts.depth,
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_engine_receives_clamped_evaluate_depth() {
        for (asked, sent) in [(3, 8), (99, 25), (14, 14)] {
            let (mut session, _kills, transcript) =
                fake_session(deepening_search(), Duration::from_secs(5));
            let request = single_request(BLACK_TO_MOVE, asked).unwrap();
            search(&mut session, &request).await.unwrap();
            assert_eq!(go_depths(&transcript.commands()), vec![sent]);
        }
    }

    #[tokio::test]
    async fn test_engine_receives_clamped_stream_depth() {
        for (asked, sent) in [(3, 8), (99, 24)] {
            let (session, _kills, transcript) =
                fake_session(deepening_search(), Duration::from_secs(5));
            let (tx, rx) = mpsc::channel(16);
            let request = stream_request(BLACK_TO_MOVE, asked).unwrap();

            let outcome = stream_search(session, request, tx).await;
            assert_eq!(outcome, StreamOutcome::Completed);
            drop(rx);
            assert_eq!(go_depths(&transcript.commands()), vec![sent]);
        }
    }

    #[test]
    fn test_requests_reject_bad_fen() {
        assert!(matches!(
            single_request("not a fen", 12),
            Err(AnalysisError::InvalidInput(_))
        ));
        assert!(matches!(
            stream_request("8/8/8/8 w - -", 12),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_evaluate_rejects_bad_fen_before_spawn() {
        // The engine path does not exist, so reaching spawn would report
        // EngineNotFound instead.
        let analyzer =
            Analyzer::new(EngineConfig::default().with_engine_path("/nonexistent/stockfish"));
        let err = analyzer.evaluate("not a fen", 12).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_evaluate_missing_engine() {
        let analyzer =
            Analyzer::new(EngineConfig::default().with_engine_path("/nonexistent/stockfish"));
        let err = analyzer.evaluate(Position::STARTPOS, 12).await.unwrap_err();
        assert_eq!(
            err,
            AnalysisError::EngineNotFound("/nonexistent/stockfish".to_string())
        );
    }

    #[tokio::test]
    async fn test_stream_missing_engine_reports_install_hint() {
        let analyzer =
            Analyzer::new(EngineConfig::default().with_engine_path("/nonexistent/stockfish"));
        let (tx, rx) = mpsc::channel(4);

        let outcome = analyzer.stream(Position::STARTPOS, 12, tx).await;
        assert_eq!(outcome, StreamOutcome::Failed);

        let events = collect(rx).await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            StreamEvent::Error { error } => assert!(error.contains("STOCKFISH_PATH")),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_bad_fen_is_error_event() {
        let analyzer = Analyzer::default();
        let (tx, rx) = mpsc::channel(4);

        let outcome = analyzer.stream("8/8/8/8 w - -", 12, tx).await;
        assert_eq!(outcome, StreamOutcome::Failed);
        assert_eq!(collect(rx).await.len(), 1);
    }
}
