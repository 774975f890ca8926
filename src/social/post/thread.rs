//! 评论树引擎
//!
//! 评论以有序森林保存：每个节点持有按时间先后排列的子回复。客户端拿不到扁平的
//! ID 索引，所以任何按 ID 的更新都是一次结构化重建：按值消费旧树，找到目标节点
//! 后交给闭包生成新节点，其余子树原样移动到新树中。

use crate::social::post::models::{
    Comment, CommentSort, LikeState, DELETED_COMMENT_PLACEHOLDER,
};
use crate::social::{CommentId, PostId, UserId};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// 子树中最近一次活动时间（自身或任一后代的创建/更新时间）
pub fn last_activity(comment: &Comment) -> DateTime<Utc> {
    comment
        .replies
        .iter()
        .map(last_activity)
        .fold(comment.created_at.max(comment.updated_at), |acc, t| acc.max(t))
}

fn newest_first(a: &Comment, b: &Comment) -> Ordering {
    b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id))
}

fn compare(sort: CommentSort, a: &Comment, b: &Comment) -> Ordering {
    match sort {
        CommentSort::Newest => newest_first(a, b),
        CommentSort::Oldest => a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)),
        CommentSort::MostLikes => b.like_count.cmp(&a.like_count).then(newest_first(a, b)),
        CommentSort::MostReplies => b
            .direct_replies()
            .cmp(&a.direct_replies())
            .then(newest_first(a, b)),
        CommentSort::RecentActivity => last_activity(b)
            .cmp(&last_activity(a))
            .then(b.id.cmp(&a.id)),
    }
}

/// 顶层按排序键排列，各层回复一律按时间正序
pub fn sort_forest(roots: &mut [Comment], sort: CommentSort) {
    roots.sort_by(|a, b| compare(sort, a, b));
    for root in roots.iter_mut() {
        sort_replies(root);
    }
}

fn sort_replies(node: &mut Comment) {
    node.replies
        .sort_by(|a, b| compare(CommentSort::Oldest, a, b));
    for reply in node.replies.iter_mut() {
        sort_replies(reply);
    }
}

/// 递归查找任意深度的节点
pub fn find_node(tree: &[Comment], id: CommentId) -> Option<&Comment> {
    tree.iter().find_map(|node| {
        if node.id == id {
            Some(node)
        } else {
            find_node(&node.replies, id)
        }
    })
}

/// 结构化重建：返回新树以及是否找到了目标节点
pub fn update_node<F>(tree: Vec<Comment>, id: CommentId, f: F) -> (Vec<Comment>, bool)
where
    F: FnOnce(Comment) -> Comment,
{
    let mut f = Some(f);
    let tree = rebuild(tree, id, &mut f);
    (tree, f.is_none())
}

fn rebuild<F>(tree: Vec<Comment>, id: CommentId, f: &mut Option<F>) -> Vec<Comment>
where
    F: FnOnce(Comment) -> Comment,
{
    tree.into_iter()
        .map(|mut node| {
            // 已命中，剩余节点直接移动
            if f.is_none() {
                return node;
            }
            if node.id == id {
                return match f.take() {
                    Some(func) => func(node),
                    None => node,
                };
            }
            if !node.replies.is_empty() {
                node.replies = rebuild(std::mem::take(&mut node.replies), id, f);
            }
            node
        })
        .collect()
}

fn for_each_mut(tree: &mut [Comment], f: &mut impl FnMut(&mut Comment)) {
    for node in tree.iter_mut() {
        f(node);
        for_each_mut(&mut node.replies, f);
    }
}

/// 翻转点赞状态，计数 ±1
pub fn toggled(mut comment: Comment) -> Comment {
    if comment.is_liked {
        comment.is_liked = false;
        comment.like_count = comment.like_count.saturating_sub(1);
    } else {
        comment.is_liked = true;
        comment.like_count += 1;
    }
    comment
}

/// 软删除：替换内容、打上删除标记，结构与子回复保持不变
pub fn tombstoned(
    mut comment: Comment,
    deleted_by: UserId,
    reason: Option<String>,
    at: DateTime<Utc>,
) -> Comment {
    comment.content = DELETED_COMMENT_PLACEHOLDER.to_string();
    comment.is_deleted = true;
    comment.deleted_by = Some(deleted_by);
    comment.deleted_at = Some(at);
    comment.deletion_reason = reason;
    comment
}

/// 某个帖子下已加载的评论树
#[derive(Debug, Clone, PartialEq)]
pub struct CommentThread {
    post_id: PostId,
    sort: CommentSort,
    roots: Vec<Comment>,
}

impl CommentThread {
    /// 全量加载（替换，不做合并）
    pub fn load(post_id: PostId, sort: CommentSort, mut roots: Vec<Comment>) -> Self {
        sort_forest(&mut roots, sort);
        Self {
            post_id,
            sort,
            roots,
        }
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub fn sort(&self) -> CommentSort {
        self.sort
    }

    pub fn roots(&self) -> &[Comment] {
        &self.roots
    }

    pub fn find(&self, id: CommentId) -> Option<&Comment> {
        find_node(&self.roots, id)
    }

    /// 节点总数（含所有层级的回复）
    pub fn len(&self) -> usize {
        fn count(tree: &[Comment]) -> usize {
            tree.iter().map(|c| 1 + count(&c.replies)).sum()
        }
        count(&self.roots)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// 深度优先展开，附带层级（渲染用）
    pub fn flatten(&self) -> Vec<(usize, &Comment)> {
        fn walk<'a>(tree: &'a [Comment], depth: usize, out: &mut Vec<(usize, &'a Comment)>) {
            for node in tree {
                out.push((depth, node));
                walk(&node.replies, depth + 1, out);
            }
        }
        let mut out = Vec::with_capacity(self.len());
        walk(&self.roots, 0, &mut out);
        out
    }

    pub fn update<F>(&mut self, id: CommentId, f: F) -> bool
    where
        F: FnOnce(Comment) -> Comment,
    {
        let (roots, found) = update_node(std::mem::take(&mut self.roots), id, f);
        self.roots = roots;
        found
    }

    /// 插入一条新评论；有父节点时追加到父节点回复末尾，
    /// 否则按当前排序插到顶层最前或最后。父节点不在本地树中时返回 false
    pub fn insert(&mut self, comment: Comment) -> bool {
        let parent = comment.parent_id;
        match parent {
            Some(parent_id) => self.update(parent_id, move |mut parent| {
                parent.reply_count = parent.direct_replies() + 1;
                parent.replies.push(comment);
                parent
            }),
            None => {
                if self.sort.prepends_new() {
                    self.roots.insert(0, comment);
                } else {
                    self.roots.push(comment);
                }
                true
            }
        }
    }

    /// 本地翻转点赞，返回翻转后的状态
    pub fn toggle_like(&mut self, id: CommentId) -> Option<LikeState> {
        let mut state = None;
        self.update(id, |node| {
            let node = toggled(node);
            state = Some(LikeState {
                is_liked: node.is_liked,
                like_count: node.like_count,
            });
            node
        });
        state
    }

    /// 以服务器返回的计数为准
    pub fn apply_like(&mut self, id: CommentId, state: LikeState) -> bool {
        self.update(id, |mut node| {
            node.is_liked = state.is_liked;
            node.like_count = state.like_count;
            node
        })
    }

    /// 软删除节点，并同步刷新引用了它的评论快照
    pub fn tombstone(
        &mut self,
        id: CommentId,
        deleted_by: UserId,
        reason: Option<String>,
        at: DateTime<Utc>,
    ) -> bool {
        let found = self.update(id, |node| tombstoned(node, deleted_by, reason, at));
        if found {
            for_each_mut(&mut self.roots, &mut |node| {
                if node.quoted_comment_id == Some(id) {
                    if let Some(quoted) = node.quoted_comment.as_mut() {
                        quoted.content = DELETED_COMMENT_PLACEHOLDER.to_string();
                        quoted.is_deleted = true;
                    }
                }
            });
        }
        found
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::social::relation::models::{AccountProfile, PrivacyLevel};
    use chrono::TimeZone;

    pub(crate) fn profile(id: UserId) -> AccountProfile {
        AccountProfile {
            id,
            username: format!("user{}", id),
            display_name: None,
            avatar_url: None,
            is_verified: false,
            bio: None,
            privacy_level: PrivacyLevel::Public,
            total_posts: 0,
            total_following: 0,
            total_followers: 0,
            created_at: Utc.timestamp_opt(0, 0).unwrap(),
        }
    }

    pub(crate) fn comment(id: CommentId, parent: Option<CommentId>, ts: i64) -> Comment {
        let at = Utc.timestamp_opt(1_700_000_000 + ts, 0).unwrap();
        Comment {
            id,
            post_id: 1,
            parent_id: parent,
            author: profile(1),
            content: format!("comment {}", id),
            created_at: at,
            updated_at: at,
            like_count: 0,
            is_liked: false,
            is_deleted: false,
            deleted_by: None,
            deleted_at: None,
            deletion_reason: None,
            quoted_comment_id: None,
            quoted_comment: None,
            reply_count: 0,
            replies: Vec::new(),
        }
    }

    fn sample_thread(sort: CommentSort) -> CommentThread {
        let mut c1 = comment(1, None, 10);
        let mut c2 = comment(2, Some(1), 20);
        c2.replies.push(comment(4, Some(2), 40));
        c1.replies.push(c2);
        let mut c3 = comment(3, None, 30);
        c3.like_count = 5;
        CommentThread::load(1, sort, vec![c1, c3])
    }

    fn root_ids(t: &CommentThread) -> Vec<CommentId> {
        t.roots().iter().map(|c| c.id).collect()
    }

    #[test]
    fn sort_keys_order_roots() {
        assert_eq!(root_ids(&sample_thread(CommentSort::Newest)), vec![3, 1]);
        assert_eq!(root_ids(&sample_thread(CommentSort::Oldest)), vec![1, 3]);
        assert_eq!(root_ids(&sample_thread(CommentSort::MostLikes)), vec![3, 1]);
        assert_eq!(root_ids(&sample_thread(CommentSort::MostReplies)), vec![1, 3]);
        // 评论 1 的子树里有 ts=40 的回复，比评论 3 更活跃
        assert_eq!(
            root_ids(&sample_thread(CommentSort::RecentActivity)),
            vec![1, 3]
        );
    }

    #[test]
    fn replies_are_kept_oldest_first() {
        let mut root = comment(1, None, 0);
        root.replies = vec![comment(3, Some(1), 30), comment(2, Some(1), 20)];
        let t = CommentThread::load(1, CommentSort::Newest, vec![root]);
        let ids: Vec<_> = t.roots()[0].replies.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn finds_and_updates_nodes_at_any_depth() {
        let mut t = sample_thread(CommentSort::Oldest);
        assert_eq!(t.len(), 4);
        assert!(t.find(4).is_some());
        assert!(t.find(99).is_none());

        assert!(t.update(4, |mut c| {
            c.content = "edited".into();
            c
        }));
        assert_eq!(t.find(4).unwrap().content, "edited");
        assert!(!t.update(99, |c| c));
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn update_leaves_other_branches_untouched() {
        let before = sample_thread(CommentSort::Oldest);
        let mut after = before.clone();
        after.toggle_like(4);
        assert_eq!(before.find(3), after.find(3));
        assert_ne!(before.find(4), after.find(4));
    }

    #[test]
    fn like_then_unlike_restores_counter() {
        let mut t = sample_thread(CommentSort::Newest);
        let liked = t.toggle_like(3).unwrap();
        assert_eq!(liked, LikeState { is_liked: true, like_count: 6 });
        let unliked = t.toggle_like(3).unwrap();
        assert_eq!(unliked, LikeState { is_liked: false, like_count: 5 });
        assert!(t.toggle_like(42).is_none());
    }

    #[test]
    fn tombstone_keeps_structure() {
        let mut t = sample_thread(CommentSort::Oldest);
        let replies_before = t.find(2).unwrap().replies.clone();
        assert!(t.tombstone(2, 1, Some("spam".into()), Utc::now()));

        let node = t.find(2).unwrap();
        assert!(node.is_deleted);
        assert_eq!(node.id, 2);
        assert_eq!(node.parent_id, Some(1));
        assert_eq!(node.content, DELETED_COMMENT_PLACEHOLDER);
        assert_eq!(node.deletion_reason.as_deref(), Some("spam"));
        assert_eq!(node.replies, replies_before);
        assert_eq!(t.find(1).unwrap().replies.len(), 1);
        assert_eq!(t.len(), 4);
    }

    #[test]
    fn deleting_a_quoted_comment_keeps_the_quoting_one() {
        let mut t = sample_thread(CommentSort::Oldest);
        let mut quoting = comment(5, None, 50);
        quoting.quoted_comment_id = Some(3);
        quoting.quoted_comment = Some(Box::new(t.find(3).unwrap().quote_snapshot()));
        assert!(t.insert(quoting));

        t.tombstone(3, 1, None, Utc::now());
        let quoting = t.find(5).unwrap();
        assert!(!quoting.is_deleted);
        assert_eq!(quoting.content, "comment 5");
        let snapshot = quoting.quoted_comment.as_ref().unwrap();
        assert!(snapshot.is_deleted);
        assert_eq!(snapshot.content, DELETED_COMMENT_PLACEHOLDER);
    }

    #[test]
    fn insert_places_by_sort_and_parent() {
        let mut newest = sample_thread(CommentSort::Newest);
        assert!(newest.insert(comment(10, None, 100)));
        assert_eq!(newest.roots()[0].id, 10);

        let mut oldest = sample_thread(CommentSort::Oldest);
        assert!(oldest.insert(comment(11, None, 100)));
        assert_eq!(oldest.roots().last().unwrap().id, 11);

        assert!(oldest.insert(comment(12, Some(4), 110)));
        let parent = oldest.find(4).unwrap();
        assert_eq!(parent.replies.last().unwrap().id, 12);
        assert_eq!(parent.reply_count, 1);

        assert!(!oldest.insert(comment(13, Some(404), 120)));
    }

    #[test]
    fn flatten_reports_depth() {
        let t = sample_thread(CommentSort::Oldest);
        let flat: Vec<_> = t.flatten().into_iter().map(|(d, c)| (d, c.id)).collect();
        assert_eq!(flat, vec![(0, 1), (1, 2), (2, 4), (0, 3)]);
    }
}
