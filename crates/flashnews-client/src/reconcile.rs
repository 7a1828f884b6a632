//! Optimistic local state for interactive actions, written once and shared
//! by every surface that renders a post.
//!
//! The pattern is the same everywhere: apply the optimistic value
//! immediately, issue the mutation, then either adopt the canonical server
//! state or fall back to the pre-image kept by the caller. All functions
//! here return new views instead of mutating shared references, so two
//! surfaces holding the same post can never diverge in place.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use flashnews_types::api::{CommentView, LikeResponse, PostView, UserSummary};

// -- Likes --

/// Optimistic like toggle: flip `is_liked` and adjust the count by one.
/// Toggling to the state the view is already in is a no-op, mirroring the
/// server's idempotent contract. Keep the original view for revert.
pub fn with_like_toggled(view: &PostView, desired: bool) -> PostView {
    if view.is_liked == desired {
        return view.clone();
    }
    let mut next = view.clone();
    next.is_liked = desired;
    next.likes_count = if desired {
        view.likes_count + 1
    } else {
        (view.likes_count - 1).max(0)
    };
    next
}

/// Adopt the canonical state from a successful like/unlike round trip.
pub fn with_like_confirmed(view: &PostView, server: &LikeResponse) -> PostView {
    let mut next = view.clone();
    next.is_liked = server.liked;
    next.likes_count = server.likes_count;
    next
}

// -- Comments --

/// Synthesize a local placeholder comment with a client-generated id and
/// timestamp. The server-assigned comment replaces it on success.
pub fn pending_comment(
    author: &UserSummary,
    post_id: Uuid,
    body: &str,
    now: DateTime<Utc>,
) -> CommentView {
    CommentView {
        comment_id: Uuid::new_v4(),
        post_id,
        author: author.clone(),
        body: body.to_string(),
        commented_at: now,
    }
}

/// Prepend the placeholder so the new comment is visible immediately.
pub fn with_pending_comment(comments: &[CommentView], pending: CommentView) -> Vec<CommentView> {
    let mut next = Vec::with_capacity(comments.len() + 1);
    next.push(pending);
    next.extend_from_slice(comments);
    next
}

/// Replace the placeholder with the server's comment (real id, server
/// timestamp). If the placeholder is gone the server comment is prepended
/// anyway so the acknowledged write is never lost.
pub fn with_comment_confirmed(
    comments: &[CommentView],
    placeholder_id: Uuid,
    server: CommentView,
) -> Vec<CommentView> {
    let mut replaced = false;
    let mut next: Vec<CommentView> = comments
        .iter()
        .map(|c| {
            if c.comment_id == placeholder_id {
                replaced = true;
                server.clone()
            } else {
                c.clone()
            }
        })
        .collect();
    if !replaced {
        next.insert(0, server);
    }
    next
}

/// Drop the placeholder after a failed create.
pub fn without_comment(comments: &[CommentView], comment_id: Uuid) -> Vec<CommentView> {
    comments
        .iter()
        .filter(|c| c.comment_id != comment_id)
        .cloned()
        .collect()
}

/// Keep a post view's comment count in step with the local thread.
pub fn with_comment_count_delta(view: &PostView, delta: i64) -> PostView {
    let mut next = view.clone();
    next.comments_count = (view.comments_count + delta).max(0);
    next
}

// -- Destructive actions --

#[derive(Debug, thiserror::Error)]
#[error("destructive action requires explicit confirmation")]
pub struct NotConfirmed;

/// Deletes are never optimistic: a failed delete must not show a vanished
/// item. The guard forces an explicit confirmation step before the target
/// id can be read for the mutation.
#[derive(Debug)]
pub struct DeleteGuard {
    target: Uuid,
    confirmed: bool,
}

impl DeleteGuard {
    pub fn new(target: Uuid) -> Self {
        Self {
            target,
            confirmed: false,
        }
    }

    pub fn confirm(&mut self) {
        self.confirmed = true;
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// The id to delete, available only after `confirm`.
    pub fn target(&self) -> Result<Uuid, NotConfirmed> {
        if self.confirmed {
            Ok(self.target)
        } else {
            Err(NotConfirmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashnews_types::api::ArticleView;

    fn author() -> UserSummary {
        UserSummary {
            user_id: Uuid::new_v4(),
            username: "alice".into(),
            bio: None,
            profile_picture: None,
        }
    }

    fn post_view(is_liked: bool, likes_count: i64) -> PostView {
        let article_id = Uuid::new_v4();
        PostView {
            post_id: Uuid::new_v4(),
            author: author(),
            description: "shared".into(),
            posted_at: Utc::now(),
            article: ArticleView {
                article_id,
                link: "https://example.com/x".into(),
                title: None,
                source: None,
                caption: None,
                preview: None,
            },
            categories: vec![],
            likes_count,
            comments_count: 0,
            is_liked,
        }
    }

    #[test]
    fn like_toggle_flips_and_adjusts_count() {
        let before = post_view(false, 2);
        let liked = with_like_toggled(&before, true);
        assert!(liked.is_liked);
        assert_eq!(liked.likes_count, 3);

        let unliked = with_like_toggled(&liked, false);
        assert_eq!(unliked.likes_count, 2);
        assert!(!unliked.is_liked);

        // Pre-image untouched: revert is just keeping `before`.
        assert_eq!(before.likes_count, 2);
        assert!(!before.is_liked);
    }

    #[test]
    fn like_toggle_to_same_state_is_noop() {
        let view = post_view(true, 5);
        let same = with_like_toggled(&view, true);
        assert_eq!(same.likes_count, 5);
        assert!(same.is_liked);
    }

    #[test]
    fn like_count_never_goes_negative() {
        let view = post_view(true, 0);
        let unliked = with_like_toggled(&view, false);
        assert_eq!(unliked.likes_count, 0);
    }

    #[test]
    fn server_count_wins_on_confirmation() {
        let optimistic = with_like_toggled(&post_view(false, 2), true);
        assert_eq!(optimistic.likes_count, 3);

        // Someone else liked concurrently; the server count is canonical.
        let confirmed = with_like_confirmed(
            &optimistic,
            &LikeResponse {
                liked: true,
                likes_count: 4,
            },
        );
        assert_eq!(confirmed.likes_count, 4);
    }

    #[test]
    fn pending_comment_is_prepended_then_replaced() {
        let post_id = Uuid::new_v4();
        let existing = vec![pending_comment(&author(), post_id, "older", Utc::now())];

        let placeholder = pending_comment(&author(), post_id, "hello", Utc::now());
        let placeholder_id = placeholder.comment_id;
        let thread = with_pending_comment(&existing, placeholder);
        assert_eq!(thread.len(), 2);
        assert_eq!(thread[0].body, "hello");

        let mut server = thread[0].clone();
        server.comment_id = Uuid::new_v4();
        let reconciled = with_comment_confirmed(&thread, placeholder_id, server.clone());
        assert_eq!(reconciled.len(), 2);
        assert_eq!(reconciled[0].comment_id, server.comment_id);
        assert!(reconciled.iter().all(|c| c.comment_id != placeholder_id));
    }

    #[test]
    fn failed_comment_removes_placeholder() {
        let post_id = Uuid::new_v4();
        let placeholder = pending_comment(&author(), post_id, "oops", Utc::now());
        let placeholder_id = placeholder.comment_id;
        let thread = with_pending_comment(&[], placeholder);

        let rolled_back = without_comment(&thread, placeholder_id);
        assert!(rolled_back.is_empty());
    }

    #[test]
    fn comment_count_tracks_thread() {
        let view = post_view(false, 0);
        let bumped = with_comment_count_delta(&view, 1);
        assert_eq!(bumped.comments_count, 1);
        let reverted = with_comment_count_delta(&bumped, -1);
        assert_eq!(reverted.comments_count, 0);
        assert_eq!(with_comment_count_delta(&reverted, -1).comments_count, 0);
    }

    #[test]
    fn delete_guard_requires_confirmation() {
        let id = Uuid::new_v4();
        let mut guard = DeleteGuard::new(id);
        assert!(guard.target().is_err());

        guard.confirm();
        assert_eq!(guard.target().unwrap(), id);
    }
}
