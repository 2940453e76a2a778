//! HTTP Lambda front end for the growth model
//!
//! POST a JSON body with an `action` of `project`, `monteCarlo`,
//! `sensitivity` or `goalSeek`. Inputs are optional and fall back to the
//! baked-in defaults; `scenario` picks a preset unless `parameters` is given.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use log::{info, warn};
use serde::Deserialize;
use serde_json::{json, Value};

use tier_projection::scenario::DEFAULT_SENSITIVITY_STEPS;
use tier_projection::{
    GoalSeekConfig, ModelError, MonteCarloConfig, ParameterKey, Parameters, ProjectionEngine,
    Scenario, ScenarioRunner, SeededSource, Trajectories,
};

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Action {
    Project,
    MonteCarlo,
    Sensitivity,
    GoalSeek,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelRequest {
    action: Action,
    scenario: Option<String>,
    parameters: Option<Parameters>,
    trajectories: Option<Trajectories>,

    // monteCarlo
    iterations: Option<usize>,
    seed: Option<u64>,

    // sensitivity / goalSeek
    parameter: Option<String>,
    range: Option<(f64, f64)>,
    steps: Option<usize>,

    // goalSeek
    metric: Option<String>,
    target: Option<f64>,
    tolerance: Option<f64>,
    max_iterations: Option<usize>,
}

// Upper bounds on request-driven loop counts
const MAX_ITERATIONS: usize = 100_000;
const MAX_STEPS: usize = 1_001;
const MAX_SOLVER_ITERATIONS: usize = 1_000;

fn required<T>(value: Option<T>, field: &str) -> Result<T, ModelError> {
    value.ok_or_else(|| ModelError::InvalidConfig(format!("missing field '{field}'")))
}

fn capped(value: Option<usize>, field: &str, limit: usize) -> Result<Option<usize>, ModelError> {
    match value {
        Some(n) if n > limit => Err(ModelError::InvalidConfig(format!(
            "'{field}' must be at most {limit}, got {n}"
        ))),
        other => Ok(other),
    }
}

/// Run one request body to a JSON response value
fn handle(body: &[u8]) -> Result<Value, ModelError> {
    let request: ModelRequest = serde_json::from_slice(body)?;
    info!("Handling {:?} request", request.action);

    let iterations = capped(request.iterations, "iterations", MAX_ITERATIONS)?;
    let steps = capped(request.steps, "steps", MAX_STEPS)?;
    let max_iterations = capped(request.max_iterations, "maxIterations", MAX_SOLVER_ITERATIONS)?;

    let params = match (request.parameters, &request.scenario) {
        (Some(params), _) => params,
        (None, Some(name)) => name.parse::<Scenario>()?.parameters(),
        (None, None) => Parameters::default(),
    };
    let runner = ScenarioRunner::new(
        ProjectionEngine::default(),
        request.trajectories.unwrap_or_default(),
    );

    let response = match request.action {
        Action::Project => serde_json::to_value(runner.project(&params)?)?,

        Action::MonteCarlo => {
            let mut source = match request.seed {
                Some(seed) => SeededSource::from_seed(seed),
                None => SeededSource::from_entropy(),
            };
            let config = match iterations {
                Some(iterations) => MonteCarloConfig::with_iterations(iterations),
                None => MonteCarloConfig::default(),
            };
            let summary = runner.monte_carlo(&params, &config, &mut source, None)?;
            json!({ "seed": source.seed(), "summary": summary })
        }

        Action::Sensitivity => {
            let key: ParameterKey = required(request.parameter, "parameter")?.parse()?;
            let points = runner.sensitivity(
                &params,
                key,
                request.range.unwrap_or((0.5, 1.5)),
                steps.unwrap_or(DEFAULT_SENSITIVITY_STEPS),
                None,
            )?;
            json!({ "parameter": key, "points": points })
        }

        Action::GoalSeek => {
            let mut config = GoalSeekConfig::from_names(
                &required(request.metric, "metric")?,
                required(request.target, "target")?,
                &required(request.parameter, "parameter")?,
            )?;
            if let Some(tolerance) = request.tolerance {
                config.tolerance = tolerance;
            }
            if let Some(max_iterations) = max_iterations {
                config.max_iterations = max_iterations;
            }
            serde_json::to_value(runner.goal_seek(&params, &config)?)?
        }
    };
    Ok(response)
}

fn json_response(status: u16, value: &Value) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(value.to_string()))?)
}

async fn function_handler(event: Request) -> Result<Response<Body>, Error> {
    let body = event.body().to_vec();
    let outcome = tokio::task::spawn_blocking(move || handle(&body)).await?;

    match outcome {
        Ok(value) => json_response(200, &value),
        Err(err) => {
            warn!("Request rejected: {err}");
            json_response(400, &json!({ "error": err.to_string() }))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    run(service_fn(function_handler)).await
}
