/* Protocol State Machine (spec §4.4): given the response type just
 * received from the console and the currently outstanding writes,
 * decides what to request next. Pure decision logic — no I/O, no
 * sleeping, so it is exhaustively testable without a transport. */

use crate::codec::frame::{Action, ResponseType};
use crate::transceiver::DeviceId;

/* At most one outstanding write of each kind (spec §3). */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingWrites {
    pub set_time: bool,
    pub set_config: bool,
    pub history_catchup: Option<u16>,
}

impl PendingWrites {
    pub fn is_idle(&self) -> bool {
        !self.set_time && !self.set_config && self.history_catchup.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextRequest {
    SendTime,
    SetConfig,
    GetHistory { index: u16 },
    GetCurrent,
}

impl NextRequest {
    pub fn action(&self) -> Action {
        match self {
            NextRequest::SendTime => Action::SendTime,
            NextRequest::SetConfig => Action::SetConfig,
            NextRequest::GetHistory { .. } => Action::GetHistory,
            NextRequest::GetCurrent => Action::GetCurrent,
        }
    }
}

/* Inputs the decision needs beyond the response type and pending
 * writes: whether the just-fetched `Config` differs from the one the
 * façade wants written, and the history ring's catch-up state. */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryProgress {
    pub latest_index: u16,
    pub this_index: u16,
}

impl HistoryProgress {
    fn caught_up(&self) -> bool {
        self.latest_index == self.this_index
    }
}

pub struct Decision<'a> {
    pub response: ResponseType,
    pub pending: &'a PendingWrites,
    pub config_dirty: bool,
    pub history: HistoryProgress,
}

/* Totality: every `(response, pending-writes)` combination maps to
 * exactly one `NextRequest` — no branch falls through silently. */
pub fn next_request(d: Decision<'_>) -> NextRequest {
    match d.response {
        ResponseType::Current => {
            if d.pending.set_time {
                NextRequest::SendTime
            } else if d.pending.set_config {
                NextRequest::SetConfig
            } else if let Some(idx) = d.pending.history_catchup {
                NextRequest::GetHistory { index: idx }
            } else {
                NextRequest::GetCurrent
            }
        }
        ResponseType::History => {
            if d.history.caught_up() {
                NextRequest::GetCurrent
            } else {
                NextRequest::GetHistory {
                    index: d.history.this_index.wrapping_add(1),
                }
            }
        }
        ResponseType::GetConfig => {
            if d.config_dirty {
                NextRequest::SetConfig
            } else {
                NextRequest::GetCurrent
            }
        }
        ResponseType::RequestSetConfig => NextRequest::SetConfig,
        ResponseType::RequestSetTime => NextRequest::SendTime,
        ResponseType::Ack => NextRequest::GetCurrent,
    }
}

/* `RequestSetConfig`/`RequestSetTime` carry a (possibly new) device
 * id; the Controller adopts it during pairing (spec §4.2). */
pub fn adopt_device_id(current: &DeviceId, response: ResponseType, candidate: u16) -> DeviceId {
    match response {
        ResponseType::RequestSetConfig | ResponseType::RequestSetTime if !current.is_paired() => {
            DeviceId(candidate)
        }
        _ => current.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(latest: u16, this: u16) -> HistoryProgress {
        HistoryProgress {
            latest_index: latest,
            this_index: this,
        }
    }

    #[test]
    fn current_with_pending_set_time_sends_time() {
        let pending = PendingWrites {
            set_time: true,
            ..Default::default()
        };
        let decision = Decision {
            response: ResponseType::Current,
            pending: &pending,
            config_dirty: false,
            history: progress(0, 0),
        };
        assert_eq!(next_request(decision), NextRequest::SendTime);
    }

    #[test]
    fn current_with_pending_set_config_takes_priority_over_history() {
        let pending = PendingWrites {
            set_config: true,
            history_catchup: Some(5),
            ..Default::default()
        };
        let decision = Decision {
            response: ResponseType::Current,
            pending: &pending,
            config_dirty: false,
            history: progress(0, 0),
        };
        assert_eq!(next_request(decision), NextRequest::SetConfig);
    }

    #[test]
    fn current_with_history_catchup_requests_that_index() {
        let pending = PendingWrites {
            history_catchup: Some(42),
            ..Default::default()
        };
        let decision = Decision {
            response: ResponseType::Current,
            pending: &pending,
            config_dirty: false,
            history: progress(0, 0),
        };
        assert_eq!(next_request(decision), NextRequest::GetHistory { index: 42 });
    }

    #[test]
    fn current_with_nothing_pending_polls_again() {
        let pending = PendingWrites::default();
        let decision = Decision {
            response: ResponseType::Current,
            pending: &pending,
            config_dirty: false,
            history: progress(0, 0),
        };
        assert_eq!(next_request(decision), NextRequest::GetCurrent);
    }

    #[test]
    fn history_not_caught_up_advances_index() {
        let pending = PendingWrites::default();
        let decision = Decision {
            response: ResponseType::History,
            pending: &pending,
            config_dirty: false,
            history: progress(10, 3),
        };
        assert_eq!(next_request(decision), NextRequest::GetHistory { index: 4 });
    }

    #[test]
    fn history_caught_up_switches_to_current() {
        let pending = PendingWrites::default();
        let decision = Decision {
            response: ResponseType::History,
            pending: &pending,
            config_dirty: false,
            history: progress(10, 10),
        };
        assert_eq!(next_request(decision), NextRequest::GetCurrent);
    }

    #[test]
    fn get_config_dirty_writes_back() {
        let pending = PendingWrites::default();
        let decision = Decision {
            response: ResponseType::GetConfig,
            pending: &pending,
            config_dirty: true,
            history: progress(0, 0),
        };
        assert_eq!(next_request(decision), NextRequest::SetConfig);
    }

    #[test]
    fn request_set_config_and_request_set_time_map_directly() {
        let pending = PendingWrites::default();
        assert_eq!(
            next_request(Decision {
                response: ResponseType::RequestSetConfig,
                pending: &pending,
                config_dirty: false,
                history: progress(0, 0),
            }),
            NextRequest::SetConfig
        );
        assert_eq!(
            next_request(Decision {
                response: ResponseType::RequestSetTime,
                pending: &pending,
                config_dirty: false,
                history: progress(0, 0),
            }),
            NextRequest::SendTime
        );
    }

    #[test]
    fn ack_polls_current() {
        let pending = PendingWrites::default();
        let decision = Decision {
            response: ResponseType::Ack,
            pending: &pending,
            config_dirty: false,
            history: progress(0, 0),
        };
        assert_eq!(next_request(decision), NextRequest::GetCurrent);
    }

    #[test]
    fn adopt_device_id_only_while_unpaired() {
        let unpaired = DeviceId::UNPAIRED;
        assert_eq!(
            adopt_device_id(&unpaired, ResponseType::RequestSetConfig, 0x12e),
            DeviceId(0x12e)
        );
        let paired = DeviceId(0x99);
        assert_eq!(
            adopt_device_id(&paired, ResponseType::RequestSetConfig, 0x12e),
            paired
        );
    }
}
