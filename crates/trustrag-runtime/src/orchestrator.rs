//! Pipeline orchestrator: the per-request state machine.
//!
//! A request walks a fixed stage sequence chosen by its mode. The
//! orchestrator applies per-stage timeouts and a single retry to
//! transient failures, absorbs the failures that degrade, checks the
//! cancellation token at every stage boundary, and assembles the
//! [`ResponseBundle`] exactly once at the end.
//!
//! Stage sequences per mode:
//!
//! - baseline:    drafting, scoring
//! - rag:         retrieving, drafting, scoring
//! - responsible: retrieving, drafting, planning, critiquing,
//!                rewriting, scoring
//!
//! With `plan_before_draft` set, responsible mode runs planning ahead
//! of drafting and feeds the plan to the grounder; otherwise planning
//! and critiquing run concurrently, both reading the finished draft.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use chrono::Utc;

use trustrag_core::{
    CriticReview, Degradation, Draft, EvidenceItem, FinalAnswer, Mode, Outcome, PlanStep,
    ResponseBundle, RetrievalError, Retriever, Stage, TrustInputs, TrustScorer,
};

use crate::client::{LlmUsage, ModelClient};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::providers::ModelProvider;
use crate::stages::{Critic, Grounder, Planner, Rewriter, StageError};

const RETRY_DELAY: Duration = Duration::from_millis(200);

const BASELINE_STAGES: &[Stage] = &[Stage::Drafting, Stage::Scoring];

const RAG_STAGES: &[Stage] = &[Stage::Retrieving, Stage::Drafting, Stage::Scoring];

const RESPONSIBLE_STAGES: &[Stage] = &[
    Stage::Retrieving,
    Stage::Drafting,
    Stage::Planning,
    Stage::Critiquing,
    Stage::Rewriting,
    Stage::Scoring,
];

const RESPONSIBLE_PLAN_FIRST_STAGES: &[Stage] = &[
    Stage::Retrieving,
    Stage::Planning,
    Stage::Drafting,
    Stage::Critiquing,
    Stage::Rewriting,
    Stage::Scoring,
];

/// Cooperative cancellation handle.
///
/// Cancellation is observed at stage boundaries only; a stage that has
/// started runs to its own completion or timeout.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A finished request: the bundle plus the client's usage counters at
/// the time of assembly.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub bundle: ResponseBundle,
    pub usage: LlmUsage,
}

/// Artifacts collected while a request walks its stages.
#[derive(Default)]
struct RequestState {
    evidence: Vec<EvidenceItem>,
    plan: Vec<PlanStep>,
    draft: Option<Draft>,
    review: Option<CriticReview>,
    final_answer: Option<FinalAnswer>,
    degradations: Vec<Degradation>,
}

/// The answer pipeline.
pub struct Pipeline {
    client: Arc<ModelClient>,
    retriever: Arc<dyn Retriever>,
    config: PipelineConfig,
    grounder: Grounder,
    planner: Planner,
    critic: Critic,
    rewriter: Rewriter,
    scorer: TrustScorer,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        retriever: Arc<dyn Retriever>,
        config: PipelineConfig,
    ) -> Self {
        let client = Arc::new(ModelClient::new(provider, &config));
        Self {
            grounder: Grounder::new(client.clone()),
            planner: Planner::new(client.clone()),
            critic: Critic::new(client.clone()),
            rewriter: Rewriter::new(client.clone()),
            client,
            retriever,
            config,
            scorer: TrustScorer::new(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run a request to completion.
    pub async fn run(&self, query: &str, mode: Mode) -> Result<PipelineResult, PipelineError> {
        self.run_with_cancel(query, mode, &CancelToken::new()).await
    }

    /// Run with the mode given as a string. Unrecognized modes are
    /// rejected before any stage runs.
    pub async fn run_str(&self, query: &str, mode: &str) -> Result<PipelineResult, PipelineError> {
        let mode: Mode = mode.parse()?;
        self.run(query, mode).await
    }

    /// Run a request, observing `cancel` at every stage boundary. A
    /// cancelled request returns `Ok` with a partial bundle whose
    /// outcome records the last stage that finished.
    pub async fn run_with_cancel(
        &self,
        query: &str,
        mode: Mode,
        cancel: &CancelToken,
    ) -> Result<PipelineResult, PipelineError> {
        let stages = self.stage_sequence(mode);
        tracing::info!(%mode, query_chars = query.len(), "request started");

        let mut state = RequestState::default();
        let mut last_completed = Stage::Idle;
        let mut i = 0;

        while i < stages.len() {
            if cancel.is_cancelled() {
                tracing::info!(after = %last_completed, "request cancelled");
                return Ok(self.assemble(
                    query,
                    mode,
                    state,
                    Outcome::Cancelled {
                        after: last_completed,
                    },
                ));
            }

            let stage = stages[i];

            // Planning immediately followed by Critiquing means both
            // read the finished draft and can run concurrently.
            if stage == Stage::Planning && stages.get(i + 1) == Some(&Stage::Critiquing) {
                self.plan_and_critique(query, &mut state).await;
                last_completed = Stage::Critiquing;
                i += 2;
                continue;
            }

            match stage {
                Stage::Retrieving => self.retrieve(query, &mut state),
                Stage::Drafting => {
                    let plan = if self.config.plan_before_draft {
                        state.plan.as_slice()
                    } else {
                        &[]
                    };
                    let draft = self
                        .call_stage(stage, || {
                            self.grounder.draft(query, &state.evidence, plan)
                        })
                        .await
                        .map_err(|source| PipelineError::GenerationFailed { stage, source })?;
                    state.draft = Some(draft);
                }
                Stage::Planning => {
                    let result = self
                        .call_stage(stage, || self.planner.plan(query, &state.evidence))
                        .await;
                    self.absorb_plan(result, &mut state);
                }
                Stage::Critiquing => {
                    let draft = state.draft.as_ref().expect("critiquing requires a draft");
                    let result = self
                        .call_stage(stage, || {
                            self.critic.review(query, draft, &state.evidence)
                        })
                        .await;
                    self.absorb_review(result, &mut state);
                }
                Stage::Rewriting => {
                    if let Some(review) = &state.review {
                        let draft = state.draft.as_ref().expect("rewriting requires a draft");
                        let answer = self
                            .call_stage(stage, || {
                                self.rewriter.rewrite(
                                    query,
                                    draft,
                                    review,
                                    state.evidence.len(),
                                )
                            })
                            .await
                            .map_err(|source| PipelineError::GenerationFailed { stage, source })?;
                        state.final_answer = Some(answer);
                    }
                    // With no review there is nothing to address; the
                    // draft stands as the final answer.
                }
                Stage::Scoring | Stage::Idle | Stage::Done => {}
            }

            last_completed = stage;
            i += 1;
        }

        Ok(self.assemble(query, mode, state, Outcome::Completed))
    }

    fn stage_sequence(&self, mode: Mode) -> &'static [Stage] {
        match mode {
            Mode::Baseline => BASELINE_STAGES,
            Mode::Rag => RAG_STAGES,
            Mode::Responsible if self.config.plan_before_draft => RESPONSIBLE_PLAN_FIRST_STAGES,
            Mode::Responsible => RESPONSIBLE_STAGES,
        }
    }

    fn retrieve(&self, query: &str, state: &mut RequestState) {
        match self.retriever.retrieve(query, self.config.k) {
            Ok(items) => {
                tracing::debug!(count = items.len(), "evidence retrieved");
                state.evidence = items;
            }
            Err(RetrievalError::Unavailable(reason)) => {
                tracing::warn!(%reason, "retrieval unavailable, proceeding without evidence");
                state
                    .degradations
                    .push(Degradation::RetrievalUnavailable { reason });
            }
        }
    }

    async fn plan_and_critique(&self, query: &str, state: &mut RequestState) {
        let draft = state.draft.as_ref().expect("critiquing requires a draft");
        let (plan, review) = tokio::join!(
            self.call_stage(Stage::Planning, || self
                .planner
                .plan(query, &state.evidence)),
            self.call_stage(Stage::Critiquing, || self
                .critic
                .review(query, draft, &state.evidence)),
        );
        self.absorb_plan(plan, state);
        self.absorb_review(review, state);
    }

    fn absorb_plan(&self, result: Result<Vec<PlanStep>, StageError>, state: &mut RequestState) {
        match result {
            Ok(plan) => state.plan = plan,
            Err(err) => {
                tracing::warn!(error = %err, "planner failed, proceeding without a plan");
                state.degradations.push(Degradation::PlannerFailed {
                    reason: err.to_string(),
                });
            }
        }
    }

    fn absorb_review(&self, result: Result<CriticReview, StageError>, state: &mut RequestState) {
        match result {
            Ok(review) => state.review = Some(review),
            Err(err) => {
                tracing::warn!(error = %err, "critic failed, safety will be unknown");
                state.degradations.push(Degradation::CriticUnparseable {
                    reason: err.to_string(),
                });
            }
        }
    }

    /// Run one stage attempt under its timeout, retrying transient
    /// failures once. Each invocation of `op` builds a fresh attempt.
    async fn call_stage<T, Fut>(
        &self,
        stage: Stage,
        op: impl Fn() -> Fut,
    ) -> Result<T, StageError>
    where
        Fut: Future<Output = Result<T, StageError>>,
    {
        let deadline = self.config.timeouts.for_stage(stage);
        let attempt = || async {
            tokio::time::timeout(deadline, op())
                .await
                .unwrap_or(Err(StageError::Timeout(deadline)))
        };

        attempt
            .retry(
                ConstantBuilder::default()
                    .with_delay(RETRY_DELAY)
                    .with_max_times(1),
            )
            .when(StageError::is_retryable)
            .notify(|err: &StageError, delay: Duration| {
                tracing::warn!(%stage, error = %err, ?delay, "retrying stage");
            })
            .await
    }

    fn assemble(
        &self,
        query: &str,
        mode: Mode,
        state: RequestState,
        outcome: Outcome,
    ) -> PipelineResult {
        let mut state = state;

        // A completed request always carries a final answer; when the
        // rewrite never ran the draft stands unchanged.
        if outcome == Outcome::Completed && state.final_answer.is_none() {
            if let Some(draft) = &state.draft {
                state.final_answer = Some(FinalAnswer {
                    text: draft.text.clone(),
                    based_on_draft: draft.id.clone(),
                });
            }
        }

        let trust = (outcome == Outcome::Completed).then(|| {
            let empty = Vec::new();
            let cited = state
                .draft
                .as_ref()
                .map(|d| d.cited_evidence_ids.as_slice())
                .unwrap_or(&[]);
            let findings = state
                .review
                .as_ref()
                .map(|r| r.findings.as_slice())
                .unwrap_or(&empty);
            let rewrite_applied = match (&state.final_answer, &state.draft) {
                (Some(answer), Some(draft)) => answer.text != draft.text,
                _ => false,
            };
            self.scorer.score(&TrustInputs {
                evidence: &state.evidence,
                cited_evidence_ids: cited,
                findings,
                safety_evaluated: state.review.is_some(),
                rewrite_applied,
            })
        });

        let (findings, critic_summary) = match state.review {
            Some(review) => (review.findings, Some(review.summary)),
            None => (Vec::new(), None),
        };

        let bundle = ResponseBundle {
            query: query.to_string(),
            mode,
            evidence: state.evidence,
            plan: state.plan,
            draft: state.draft,
            findings,
            critic_summary,
            final_answer: state.final_answer,
            trust,
            degradations: state.degradations,
            outcome,
            created_at: Utc::now(),
        };

        tracing::info!(
            %mode,
            complete = bundle.is_complete(),
            degradations = bundle.degradations.len(),
            "request finished"
        );

        PipelineResult {
            bundle,
            usage: self.client.usage(),
        }
    }
}
