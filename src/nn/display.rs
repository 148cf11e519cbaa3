/*
 * @Author       : 老董
 * @Date         : 2024-02-04 20:37:13
 * @LastEditors  : 老董
 * @LastEditTime : 2026-02-06 10:12:40
 * @Description  : 节点与连线的显示格式化
 */

use super::NodeId;
use super::graph::Wire;

/// 格式化节点的显示
///
/// # Arguments
/// * `id` - 节点ID
/// * `name` - 节点名称
/// * `type_name` - 节点类型标签
/// * `wires` - 节点的输出连线
///
/// # Returns
/// 返回格式化后的字符串，格式为：`节点[id=1, name=xx, type=xx] -> [2@0, 3@1]`；
/// 没有输出连线时省略箭头部分
pub(in crate::nn) fn format_node_display(
    id: NodeId,
    name: &str,
    type_name: &str,
    wires: &[Wire],
) -> String {
    let head = format!("节点[id={}, name={}, type={}]", id.0, name, type_name);
    if wires.is_empty() {
        return head;
    }
    let targets: Vec<String> = wires
        .iter()
        .map(|w| format!("{}@{}", w.target.0, w.channel))
        .collect();
    format!("{head} -> [{}]", targets.join(", "))
}
