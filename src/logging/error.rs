// SPDX-License-Identifier: Apache-2.0 OR MIT
// Errors reported while setting up sinks
//
// Producers never see these: dispatch ignores sink I/O failures. They only
// surface to the code that opens or closes a sink.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to open log file '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to flush log file: {0}")]
    Flush(#[from] std::io::Error),
}
