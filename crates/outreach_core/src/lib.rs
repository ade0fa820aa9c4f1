//! Outreach core: domain types, response-shape normalization and the pure
//! job-polling state machine.
mod config;
mod effect;
mod job;
mod models;
mod msg;
mod shape;
mod state;
mod update;
mod view_model;

pub use config::{
    upsert_entry, ConfigEntry, ConfigUpdate, API_TOKEN_KEY, INSTAGRAM_COOKIES_KEY,
    INSTAGRAM_PASSWORD_KEY, INSTAGRAM_USERNAME_KEY, LOCAL_CREDENTIAL_KEYS, SESSION_TOKEN_KEY,
};
pub use effect::PollEffect;
pub use job::{
    JobId, JobStatus, JobSummary, MessageTask, MessageTaskCreate, MessageTaskSettings,
    MessageTaskStatus, Platform, SearchParams, SearchTask, SearchTaskCreate, SearchTaskStatus,
};
pub use models::{
    TagLogic, TagOption, Template, TemplateCreate, TemplateUpdate, User, UserCreate, UserGroup,
    UserGroupCreate, UserGroupUpdate, UserUpdate,
};
pub use msg::PollMsg;
pub use shape::{classify, parse_body, Listing, PageInfo, ResponseShape, ShapeError};
pub use state::{
    Generation, PollConfig, PollPhase, PollSession, PollTarget, DEFAULT_MAX_RETRIES,
};
pub use update::update;
pub use view_model::PollSnapshot;
