use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use futures::future::BoxFuture;

use super::{ChannelInfo, ChatGateway, GatewayError, GatewayResult, MessageView};

/// A call observed by [`RecordingGateway`].
#[derive(Debug, Clone)]
pub enum GatewayCall {
    Post {
        channel_id: String,
        view: MessageView,
    },
    Edit {
        channel_id: String,
        message_id: String,
        view: MessageView,
    },
}

/// In-memory gateway that hands out sequential message ids and records every render.
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<GatewayCall>>,
    next_id: AtomicU64,
    failing: AtomicBool,
    after_post: Mutex<Option<BoxFuture<'static, ()>>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent post/edit fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Run `work` after the next post is recorded, before its id is handed back.
    pub fn run_after_next_post(&self, work: BoxFuture<'static, ()>) {
        *self.after_post.lock().unwrap() = Some(work);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The last view sent for `message_id`, posted or edited.
    pub fn last_view_of(&self, message_id: &str) -> Option<MessageView> {
        let calls = self.calls.lock().unwrap();
        let mut posted = 0u64;
        let mut last = None;
        for call in calls.iter() {
            match call {
                GatewayCall::Post { view, .. } => {
                    posted += 1;
                    if format!("msg-{posted}") == message_id {
                        last = Some(view.clone());
                    }
                }
                GatewayCall::Edit {
                    message_id: edited,
                    view,
                    ..
                } if edited == message_id => last = Some(view.clone()),
                GatewayCall::Edit { .. } => {}
            }
        }
        last
    }

    fn fail(&self) -> Option<GatewayError> {
        self.failing
            .load(Ordering::SeqCst)
            .then(|| GatewayError::Rejected {
                path: "test".into(),
                status: 500,
            })
    }
}

impl ChatGateway for RecordingGateway {
    fn fetch_channel(&self, channel_id: String) -> BoxFuture<'static, GatewayResult<Option<ChannelInfo>>> {
        Box::pin(async move {
            Ok(Some(ChannelInfo {
                id: channel_id,
                text_based: true,
            }))
        })
    }

    fn post_message(&self, channel_id: String, view: MessageView) -> BoxFuture<'static, GatewayResult<String>> {
        let result = match self.fail() {
            Some(err) => Err(err),
            None => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                self.calls
                    .lock()
                    .unwrap()
                    .push(GatewayCall::Post { channel_id, view });
                Ok(format!("msg-{id}"))
            }
        };
        let after_post = self.after_post.lock().unwrap().take();
        Box::pin(async move {
            if let Some(work) = after_post {
                work.await;
            }
            result
        })
    }

    fn edit_message(
        &self,
        channel_id: String,
        message_id: String,
        view: MessageView,
    ) -> BoxFuture<'static, GatewayResult<String>> {
        let result = match self.fail() {
            Some(err) => Err(err),
            None => {
                self.calls.lock().unwrap().push(GatewayCall::Edit {
                    channel_id,
                    message_id: message_id.clone(),
                    view,
                });
                Ok(message_id)
            }
        };
        Box::pin(async move { result })
    }
}
