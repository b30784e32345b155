use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use box_world_core::{
    Direction, EntityId, Position,
    config::SimulationConfig,
    environment::{Correction, Environment, SimulationError},
    snapshot::{SimulationSummary, Snapshot},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::Mutex};
use tracing::{debug, info, warn};

pub const DEFAULT_PORT: u16 = 8585;

/// Everything needed to start the listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub simulation: SimulationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            simulation: SimulationConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("server io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid listen address {0}")]
    Address(String),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Body of a correction request.
#[derive(Debug, Clone, Deserialize)]
pub struct CorrectionRequest {
    pub id: EntityId,
    pub position: Option<Position>,
    pub direction: Option<Direction>,
}

#[derive(Debug)]
struct HttpApiError {
    status: StatusCode,
    message: String,
}

impl HttpApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn from_simulation(err: SimulationError) -> Self {
        match err {
            SimulationError::RobotNotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                message: err.to_string(),
            },
            SimulationError::World(_) => Self::bad_request(err.to_string()),
            SimulationError::Config(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: err.to_string(),
            },
        }
    }
}

impl IntoResponse for HttpApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Shared handle to the one authoritative simulation.
///
/// Every request holds the lock for its whole correct, snapshot, tick sequence.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Mutex<Environment>>,
}

impl AppState {
    pub fn new(environment: Environment) -> Self {
        Self {
            inner: Arc::new(Mutex::new(environment)),
        }
    }

    pub async fn summary(&self) -> SimulationSummary {
        self.inner.lock().await.summary()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(read_state).post(correct_robot))
        .with_state(state)
}

/// Snapshots the world, then advances it one tick.
async fn read_state(State(state): State<AppState>) -> Json<Snapshot> {
    let mut env = state.inner.lock().await;
    let snapshot = env.snapshot();
    let tick = env.process_turn();
    debug!(tick, "served read request");
    Json(snapshot)
}

/// Applies an external correction, snapshots the world, then advances it one tick.
///
/// The body is parsed as JSON whatever its content type. A rejected correction
/// leaves the world and its tick untouched.
async fn correct_robot(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Snapshot>, HttpApiError> {
    let request: CorrectionRequest = serde_json::from_slice(&body).map_err(|err| {
        warn!(%err, "malformed correction request");
        HttpApiError::bad_request(format!("Invalid correction body: {err}"))
    })?;

    let mut env = state.inner.lock().await;
    env.apply_correction(
        request.id,
        Correction {
            position: request.position,
            direction: request.direction,
        },
    )
    .map_err(|err| {
        warn!(robot = request.id, %err, "correction rejected");
        HttpApiError::from_simulation(err)
    })?;

    let snapshot = env.snapshot();
    let tick = env.process_turn();
    debug!(tick, robot = request.id, "served correction request");
    Ok(Json(snapshot))
}

/// Builds the environment and serves it until `shutdown` resolves, then logs
/// the run summary.
pub async fn serve<F>(config: ServerConfig, shutdown: F) -> Result<SimulationSummary, ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|_| ServerError::Address(format!("{}:{}", config.host, config.port)))?;
    let environment = Environment::from_config(&config.simulation)?;
    info!(
        %addr,
        rows = config.simulation.rows,
        cols = config.simulation.cols,
        robots = config.simulation.robots,
        boxes = config.simulation.boxes,
        seed = environment.seed(),
        "starting box world server"
    );

    let state = AppState::new(environment);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown)
        .await?;

    let summary = state.summary().await;
    info!(
        ticks = summary.ticks,
        stacks = summary.stack_sizes.len(),
        boxes_in_stacks = summary.boxes_in_stacks,
        single_boxes = summary.single_boxes,
        "simulation stopped"
    );
    for tally in &summary.robots {
        info!(
            robot = tally.id,
            grabbed = tally.grabbed,
            stacked = tally.stacked,
            "robot totals"
        );
    }
    Ok(summary)
}
