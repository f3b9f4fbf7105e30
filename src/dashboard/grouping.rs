//! 时间线排序与分组

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::{GroupedProviderTimelines, ProviderTimeline};

/// 未分组桶的键
pub const UNGROUPED_KEY: &str = "__ungrouped__";
/// 未分组桶的展示名
pub const UNGROUPED_DISPLAY_NAME: &str = "未分组";

/// 先按不区分大小写的顺序比较，再按原文比较，保证全序
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// 按 Provider 名称稳定排序
pub fn sort_by_name(timelines: &mut [ProviderTimeline]) {
    timelines.sort_by(|a, b| compare_names(a.name(), b.name()));
}

/// 按分组名归类：命名分组按名称排序，未分组桶放在最后；组内按 Provider 名称排序
#[must_use]
pub fn group_timelines(timelines: &[ProviderTimeline]) -> Vec<GroupedProviderTimelines> {
    let mut named: BTreeMap<&str, Vec<ProviderTimeline>> = BTreeMap::new();
    let mut ungrouped = Vec::new();

    for timeline in timelines {
        match timeline.group_name().filter(|g| !g.is_empty()) {
            Some(group) => named.entry(group).or_default().push(timeline.clone()),
            None => ungrouped.push(timeline.clone()),
        }
    }

    let mut groups: Vec<GroupedProviderTimelines> = named
        .into_iter()
        .map(|(group, mut members)| {
            sort_by_name(&mut members);
            GroupedProviderTimelines {
                group_name: group.to_string(),
                display_name: group.to_string(),
                timelines: members,
            }
        })
        .collect();
    groups.sort_by(|a, b| compare_names(&a.group_name, &b.group_name));

    if !ungrouped.is_empty() {
        sort_by_name(&mut ungrouped);
        groups.push(GroupedProviderTimelines {
            group_name: UNGROUPED_KEY.to_string(),
            display_name: UNGROUPED_DISPLAY_NAME.to_string(),
            timelines: ungrouped,
        });
    }
    groups
}
