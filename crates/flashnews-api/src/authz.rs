//! Pure permission checks for (actor, resource) pairs. No side effects,
//! no storage access. Every check fails closed: an empty actor id denies.

use flashnews_db::models::{CollectionRow, CommentRow, PostRow, UserRow};

/// Posts are world-viewable; the feed is public.
pub fn can_view_post(_actor_id: &str, _post: &PostRow) -> bool {
    true
}

/// Only the author may edit or delete a post.
pub fn can_mutate_post(actor_id: &str, post: &PostRow) -> bool {
    !actor_id.is_empty() && post.author_id == actor_id
}

/// Public collections are viewable by anyone; private ones only by the owner.
pub fn can_view_collection(actor_id: &str, collection: &CollectionRow) -> bool {
    collection.is_public || (!actor_id.is_empty() && collection.owner_id == actor_id)
}

/// Only the owner may mutate a collection, public or not.
pub fn can_mutate_collection(actor_id: &str, collection: &CollectionRow) -> bool {
    !actor_id.is_empty() && collection.owner_id == actor_id
}

/// Comments are viewable wherever their parent post is; deletable only by
/// their author.
pub fn can_delete_comment(actor_id: &str, comment: &CommentRow) -> bool {
    !actor_id.is_empty() && comment.author_id == actor_id
}

/// Account-level mutations: only the account holder.
pub fn can_touch_user(actor_id: &str, user: &UserRow) -> bool {
    !actor_id.is_empty() && user.id == actor_id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(author: &str) -> PostRow {
        PostRow {
            id: "p1".into(),
            author_id: author.into(),
            article_id: "a1".into(),
            description: "d".into(),
            posted_at: "2026-08-01T10:00:00+00:00".into(),
        }
    }

    fn collection(owner: &str, is_public: bool) -> CollectionRow {
        CollectionRow {
            id: "c1".into(),
            owner_id: owner.into(),
            title: "Tech".into(),
            emoji: "💻".into(),
            description: String::new(),
            is_public,
            created_at: "2026-08-01T10:00:00+00:00".into(),
        }
    }

    #[test]
    fn posts_are_world_viewable_but_author_mutable() {
        let p = post("alice");
        assert!(can_view_post("bob", &p));
        assert!(can_view_post("", &p));
        assert!(can_mutate_post("alice", &p));
        assert!(!can_mutate_post("bob", &p));
        assert!(!can_mutate_post("", &p));
    }

    #[test]
    fn private_collection_visible_to_owner_only() {
        let c = collection("alice", false);
        assert!(can_view_collection("alice", &c));
        assert!(!can_view_collection("bob", &c));
        assert!(!can_view_collection("", &c));
    }

    #[test]
    fn public_collection_visible_to_all_mutable_by_owner() {
        let c = collection("alice", true);
        assert!(can_view_collection("bob", &c));
        assert!(can_mutate_collection("alice", &c));
        assert!(!can_mutate_collection("bob", &c));
    }

    #[test]
    fn comment_deletable_by_author_only() {
        let c = CommentRow {
            id: "cm1".into(),
            post_id: "p1".into(),
            author_id: "bob".into(),
            body: "hi".into(),
            commented_at: "2026-08-01T10:00:00+00:00".into(),
        };
        assert!(can_delete_comment("bob", &c));
        assert!(!can_delete_comment("alice", &c));
        assert!(!can_delete_comment("", &c));
    }
}
