//! Versioned channel storage: the substrate `VersionedState` is built from.
//!
//! Each channel owns one piece of state (messages, free-form extras,
//! accumulated errors) plus a monotonically increasing version counter that
//! only advances when the executor observes an actual change after a
//! reducer pass.

pub mod errors;

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::channels::errors::ErrorEvent;
use crate::message::Message;

/// Common behavior shared by every versioned channel.
pub trait Channel {
    type Data;

    fn new(data: Self::Data, version: u32) -> Self;
    fn get(&self) -> &Self::Data;
    fn get_mut(&mut self) -> &mut Self::Data;
    fn snapshot(&self) -> Self::Data;
    fn version(&self) -> u32;
    fn set_version(&mut self, version: u32);
}

macro_rules! impl_len_passthrough {
    ($ty:ty) => {
        impl $ty {
            pub fn len(&self) -> usize {
                self.data.len()
            }

            pub fn is_empty(&self) -> bool {
                self.data.is_empty()
            }
        }
    };
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessagesChannel {
    data: Vec<Message>,
    version: u32,
}

impl Channel for MessagesChannel {
    type Data = Vec<Message>;

    fn new(data: Self::Data, version: u32) -> Self {
        Self { data, version }
    }

    fn get(&self) -> &Self::Data {
        &self.data
    }

    fn get_mut(&mut self) -> &mut Self::Data {
        &mut self.data
    }

    fn snapshot(&self) -> Self::Data {
        self.data.clone()
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtrasChannel {
    data: FxHashMap<String, Value>,
    version: u32,
}

impl Channel for ExtrasChannel {
    type Data = FxHashMap<String, Value>;

    fn new(data: Self::Data, version: u32) -> Self {
        Self { data, version }
    }

    fn get(&self) -> &Self::Data {
        &self.data
    }

    fn get_mut(&mut self) -> &mut Self::Data {
        &mut self.data
    }

    fn snapshot(&self) -> Self::Data {
        self.data.clone()
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorsChannel {
    data: Vec<ErrorEvent>,
    version: u32,
}

impl Channel for ErrorsChannel {
    type Data = Vec<ErrorEvent>;

    fn new(data: Self::Data, version: u32) -> Self {
        Self { data, version }
    }

    fn get(&self) -> &Self::Data {
        &self.data
    }

    fn get_mut(&mut self) -> &mut Self::Data {
        &mut self.data
    }

    fn snapshot(&self) -> Self::Data {
        self.data.clone()
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn set_version(&mut self, version: u32) {
        self.version = version;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_channel_round_trips() {
        let mut ch = MessagesChannel::new(vec![Message::user("hi")], 1);
        assert_eq!(ch.version(), 1);
        ch.get_mut().push(Message::assistant("hello"));
        assert_eq!(ch.snapshot().len(), 2);
    }

    #[test]
    fn extras_channel_snapshot_is_independent() {
        let mut ch = ExtrasChannel::default();
        ch.get_mut().insert("k".into(), Value::String("v".into()));
        let snap = ch.snapshot();
        ch.get_mut().insert("k2".into(), Value::String("v2".into()));
        assert!(snap.contains_key("k"));
        assert!(!snap.contains_key("k2"));
    }
}

impl_len_passthrough!(MessagesChannel);
impl_len_passthrough!(ErrorsChannel);
