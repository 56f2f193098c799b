//! Friendship resolution for the friend feed.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::models::{FriendEdge, FriendStatus};

/// Opposite endpoints of `user_id`'s accepted edges, deduplicated.
///
/// Edges may point either way; a mutual pair counts once. Self-edges and
/// edges not touching `user_id` are ignored.
pub fn friend_set(user_id: Uuid, edges: &[FriendEdge]) -> Vec<Uuid> {
    let friends: BTreeSet<Uuid> = edges
        .iter()
        .filter(|e| e.status == FriendStatus::Accepted)
        .filter_map(|e| {
            if e.user_id == user_id {
                Some(e.friend_id)
            } else if e.friend_id == user_id {
                Some(e.user_id)
            } else {
                None
            }
        })
        .filter(|id| *id != user_id)
        .collect();
    friends.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(user_id: Uuid, friend_id: Uuid, status: FriendStatus) -> FriendEdge {
        FriendEdge {
            user_id,
            friend_id,
            status,
        }
    }

    #[test]
    fn mutual_edges_count_once() {
        let me = Uuid::new_v4();
        let a = Uuid::new_v4();
        let edges = vec![
            edge(me, a, FriendStatus::Accepted),
            edge(a, me, FriendStatus::Accepted),
        ];
        assert_eq!(friend_set(me, &edges), vec![a]);
    }

    #[test]
    fn only_accepted_edges_touching_user() {
        let me = Uuid::new_v4();
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let edges = vec![
            edge(me, a, FriendStatus::Accepted),
            edge(b, me, FriendStatus::Accepted),
            edge(me, c, FriendStatus::Pending),
            edge(c, d, FriendStatus::Accepted),
            edge(me, me, FriendStatus::Accepted),
        ];
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(friend_set(me, &edges), expected);
    }

    #[test]
    fn no_edges_no_friends() {
        assert!(friend_set(Uuid::new_v4(), &[]).is_empty());
    }
}
