use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Processing,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

/// Operations that move a job through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobCommand {
    Start,
    Pause,
    Resume,
    Cancel,
    Complete,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {command} a job that is {from}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub command: JobCommand,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// The lifecycle transition table. Every status change goes through here.
    pub fn apply(self, command: JobCommand) -> Result<JobStatus, InvalidTransition> {
        let next = match (self, command) {
            (JobStatus::Pending, JobCommand::Start) => JobStatus::Processing,
            (JobStatus::Processing, JobCommand::Pause) => JobStatus::Paused,
            (JobStatus::Paused, JobCommand::Resume) => JobStatus::Processing,
            (JobStatus::Processing | JobStatus::Paused, JobCommand::Cancel) => {
                JobStatus::Cancelled
            }
            (JobStatus::Processing, JobCommand::Complete) => JobStatus::Completed,
            (JobStatus::Processing, JobCommand::Fail) => JobStatus::Failed,
            (from, command) => return Err(InvalidTransition { from, command }),
        };
        Ok(next)
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "paused" => Ok(JobStatus::Paused),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl JobCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobCommand::Start => "start",
            JobCommand::Pause => "pause",
            JobCommand::Resume => "resume",
            JobCommand::Cancel => "cancel",
            JobCommand::Complete => "complete",
            JobCommand::Fail => "fail",
        }
    }
}

impl fmt::Display for JobCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
