//! Flattens a sync batch into inbound messages and classifies each one.

use crate::{
    domain::{RoomId, UserId},
    transport::{SyncResponse, MESSAGE_EVENT_TYPE},
};

/// Leading marker of a bot command.
pub const COMMAND_MARKER: char = '!';

/// A message event pulled out of a room timeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    pub room_id: RoomId,
    pub sender: UserId,
    pub body: String,
    /// Index within the room's timeline for this batch.
    pub position: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Command {
    /// Marker plus keyword, as typed (`!Ping`).
    pub token: String,
    /// Everything after the token, trimmed.
    pub args: String,
    pub sender: UserId,
    pub room_id: RoomId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FreeText {
    pub text: String,
    pub sender: UserId,
    pub room_id: RoomId,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Routed {
    Command(Command),
    FreeText(FreeText),
}

impl Routed {
    pub fn room_id(&self) -> &RoomId {
        match self {
            Routed::Command(c) => &c.room_id,
            Routed::FreeText(t) => &t.room_id,
        }
    }
}

/// Message events from every joined room, excluding the bot's own echoes.
///
/// Order is preserved within a room; rooms are visited in id order.
pub fn inbound_messages(batch: &SyncResponse, own: &UserId) -> Vec<InboundMessage> {
    let mut out = Vec::new();
    for (room_id, room) in &batch.rooms.join {
        for (position, event) in room.timeline.events.iter().enumerate() {
            if event.kind != MESSAGE_EVENT_TYPE {
                continue;
            }
            let Some(sender) = &event.sender else {
                continue;
            };
            if sender == own {
                continue;
            }
            let Some(body) = event.body() else {
                continue;
            };
            out.push(InboundMessage {
                room_id: room_id.clone(),
                sender: sender.clone(),
                body: body.to_string(),
                position,
            });
        }
    }
    out
}

pub fn classify(msg: InboundMessage) -> Routed {
    if !msg.body.starts_with(COMMAND_MARKER) {
        return Routed::FreeText(FreeText {
            text: msg.body,
            sender: msg.sender,
            room_id: msg.room_id,
        });
    }

    let mut parts = msg.body.splitn(2, char::is_whitespace);
    let token = parts.next().unwrap_or("").to_string();
    let args = parts.next().unwrap_or("").trim().to_string();

    Routed::Command(Command {
        token,
        args,
        sender: msg.sender,
        room_id: msg.room_id,
    })
}

pub fn route(batch: &SyncResponse, own: &UserId) -> Vec<Routed> {
    inbound_messages(batch, own)
        .into_iter()
        .map(classify)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{batch, text_event};
    use crate::transport::RawEvent;

    fn me() -> UserId {
        UserId("@bot:hs".to_string())
    }

    #[test]
    fn two_rooms_with_self_echo_yield_two_messages_in_order() {
        let b = batch(
            "s2",
            vec![
                (
                    "!a:hs",
                    vec![
                        text_event("@alice:hs", "first"),
                        text_event("@bot:hs", "my own reply"),
                        text_event("@bob:hs", "second"),
                    ],
                ),
                ("!b:hs", vec![]),
            ],
        );

        let msgs = inbound_messages(&b, &me());
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].body, "first");
        assert_eq!(msgs[0].position, 0);
        assert_eq!(msgs[1].body, "second");
        assert_eq!(msgs[1].position, 2);
        assert!(msgs.iter().all(|m| m.sender != me()));
    }

    #[test]
    fn non_message_and_bodyless_events_are_skipped() {
        let member = RawEvent {
            kind: "m.room.member".to_string(),
            sender: Some(UserId("@alice:hs".to_string())),
            event_id: None,
            content: serde_json::json!({ "membership": "join" }),
        };
        let no_body = RawEvent {
            kind: "m.room.message".to_string(),
            sender: Some(UserId("@alice:hs".to_string())),
            event_id: None,
            content: serde_json::json!({ "msgtype": "m.image" }),
        };
        let b = batch("s", vec![("!a:hs", vec![member, no_body])]);
        assert!(route(&b, &me()).is_empty());
    }

    #[test]
    fn classifies_commands_and_free_text() {
        let b = batch(
            "s",
            vec![(
                "!a:hs",
                vec![
                    text_event("@alice:hs", "!calc  2 + 2 "),
                    text_event("@alice:hs", "hello there"),
                    text_event("@alice:hs", "!nosuchthing"),
                ],
            )],
        );
        let routed = route(&b, &me());
        assert_eq!(routed.len(), 3);

        match &routed[0] {
            Routed::Command(c) => {
                assert_eq!(c.token, "!calc");
                assert_eq!(c.args, "2 + 2");
                assert_eq!(c.room_id, RoomId("!a:hs".into()));
            }
            other => panic!("expected command, got {other:?}"),
        }
        assert!(matches!(&routed[1], Routed::FreeText(t) if t.text == "hello there"));
        // Unknown tokens are still commands; validity is the dispatcher's call.
        assert!(matches!(&routed[2], Routed::Command(c) if c.token == "!nosuchthing" && c.args.is_empty()));
    }

    #[test]
    fn each_event_is_routed_exactly_once() {
        let b = batch(
            "s",
            vec![
                ("!a:hs", vec![text_event("@x:hs", "one")]),
                ("!b:hs", vec![text_event("@y:hs", "two")]),
            ],
        );
        let routed = route(&b, &me());
        let bodies: Vec<_> = routed
            .iter()
            .map(|r| match r {
                Routed::FreeText(t) => t.text.as_str(),
                Routed::Command(c) => c.token.as_str(),
            })
            .collect();
        assert_eq!(bodies, ["one", "two"]);
        let rooms: Vec<_> = routed.iter().map(|r| r.room_id().0.as_str()).collect();
        assert_eq!(rooms, ["!a:hs", "!b:hs"]);
    }

    #[test]
    fn typeless_events_are_ignored() {
        let typeless = RawEvent {
            kind: String::new(),
            sender: Some(UserId("@alice:hs".to_string())),
            event_id: None,
            content: serde_json::json!({ "body": "!ping" }),
        };
        let b = batch(
            "s",
            vec![("!a:hs", vec![typeless, text_event("@alice:hs", "hi")])],
        );
        let routed = route(&b, &me());
        assert_eq!(routed.len(), 1);
        assert!(matches!(&routed[0], Routed::FreeText(t) if t.text == "hi"));
    }
}
