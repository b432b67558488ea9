// SPDX-License-Identifier: MIT

use super::seed::SeededRng;
use super::{Card, Reading, Symbols};

const CARDS: [(&str, &str); 36] = [
    ("骑士", "消息与行动"),
    ("三叶草", "小确幸"),
    ("船", "旅程与变化"),
    ("房屋", "基础与安全"),
    ("树", "成长与健康"),
    ("云", "不确定"),
    ("蛇", "复杂与试探"),
    ("棺材", "结束与转化"),
    ("花束", "惊喜与友好"),
    ("镰刀", "快速切换"),
    ("鞭子", "压力与反复"),
    ("鸟", "沟通与焦虑"),
    ("孩子", "新开始"),
    ("狐狸", "策略与谨慎"),
    ("熊", "资源与掌控"),
    ("星星", "方向与愿景"),
    ("鹳", "改变与搬迁"),
    ("狗", "信任与伙伴"),
    ("塔", "边界与制度"),
    ("花园", "社交与公开"),
    ("山", "阻碍"),
    ("道路", "选择"),
    ("老鼠", "消耗"),
    ("心", "情感"),
    ("戒指", "承诺"),
    ("书", "隐情"),
    ("信", "信息"),
    ("男人", "男性能量"),
    ("女人", "女性能量"),
    ("百合", "和谐"),
    ("太阳", "成功"),
    ("月亮", "名誉与情绪"),
    ("钥匙", "答案"),
    ("鱼", "财富与流动"),
    ("锚", "稳定"),
    ("十字", "责任"),
];

const POSITIONS: [&str; 3] = ["起因", "过程", "结果"];

const OPENING: [&str; 3] = ["太阳", "钥匙", "鱼"];
const RESISTANCE: [&str; 3] = ["山", "十字", "云"];

const ADVICE: [&str; 3] = [
    "聚焦最能带来结果的动作",
    "避免被情绪牵着走",
    "给出明确的选择与时间点",
];

/// Three-card cause/process/outcome line
pub fn draw_lenormand(question: &str, seed_key: &str) -> Reading {
    let mut rng = SeededRng::new("lenormand", seed_key, question);
    let drawn = rng.sample(&CARDS, POSITIONS.len());

    let cards: Vec<Card> = drawn
        .iter()
        .zip(POSITIONS)
        .map(|((name, meaning), position)| Card {
            name: name.to_string(),
            meaning: meaning.to_string(),
            position: position.to_string(),
            orientation: None,
        })
        .collect();

    Reading {
        verdict: compose_verdict(&cards),
        symbols: Symbols::Cards(cards),
        advice: ADVICE.iter().map(|s| s.to_string()).collect(),
    }
}

fn compose_verdict(cards: &[Card]) -> String {
    let keywords = cards
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join("、");
    let any_of = |set: &[&str]| cards.iter().any(|c| set.contains(&c.name.as_str()));

    if any_of(&OPENING) {
        format!("牌面显示{}，结果倾向打开局面。", keywords)
    } else if any_of(&RESISTANCE) {
        format!("牌面显示{}，需要面对现实阻力。", keywords)
    } else {
        format!("牌面显示{}，节奏取决于你的下一步行动。", keywords)
    }
}
