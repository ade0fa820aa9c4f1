use std::sync::mpsc;

use outreach_logging::{outreach_error, outreach_info, outreach_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Warning,
    Error,
}

/// A user-facing message about the outcome of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

pub trait NoticeSink: Send + Sync {
    fn emit(&self, notice: Notice);
}

/// Writes notices to the log; the default when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNoticeSink;

impl NoticeSink for LogNoticeSink {
    fn emit(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => outreach_info!("{}", notice.message),
            NoticeLevel::Warning => outreach_warn!("{}", notice.message),
            NoticeLevel::Error => outreach_error!("{}", notice.message),
        }
    }
}

pub struct ChannelNoticeSink {
    tx: mpsc::Sender<Notice>,
}

impl ChannelNoticeSink {
    pub fn new(tx: mpsc::Sender<Notice>) -> Self {
        Self { tx }
    }
}

impl NoticeSink for ChannelNoticeSink {
    fn emit(&self, notice: Notice) {
        let _ = self.tx.send(notice);
    }
}
