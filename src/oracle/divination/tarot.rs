// SPDX-License-Identifier: MIT

use super::seed::SeededRng;
use super::{Card, Reading, Symbols};

const MAJOR_ARCANA: [(&str, &str); 22] = [
    ("愚者", "开启新的旅程"),
    ("魔术师", "掌控与行动"),
    ("女祭司", "直觉与内省"),
    ("女皇", "滋养与成长"),
    ("皇帝", "结构与规则"),
    ("教皇", "传统与承诺"),
    ("恋人", "关系与选择"),
    ("战车", "推进与胜利"),
    ("力量", "温柔的坚定"),
    ("隐者", "独处与思考"),
    ("命运之轮", "变化与机遇"),
    ("正义", "公平与平衡"),
    ("倒吊人", "暂停与换角度"),
    ("死神", "结束与重启"),
    ("节制", "调和与耐心"),
    ("恶魔", "执念与束缚"),
    ("高塔", "突发与重构"),
    ("星星", "希望与指引"),
    ("月亮", "迷雾与情绪"),
    ("太阳", "清晰与喜悦"),
    ("审判", "觉醒与决定"),
    ("世界", "完成与收束"),
];

const POSITIONS: [&str; 3] = ["过去", "现在", "未来"];

pub const UPRIGHT: &str = "正位";
pub const REVERSED: &str = "逆位";

/// Probability that a card is reversed
const REVERSED_ODDS: f64 = 0.3;

/// Three-card past/present/future spread from the major arcana
pub fn draw_tarot(question: &str, seed_key: &str) -> Reading {
    let mut rng = SeededRng::new("tarot", seed_key, question);
    let drawn = rng.sample(&MAJOR_ARCANA, POSITIONS.len());

    let cards: Vec<Card> = drawn
        .into_iter()
        .zip(POSITIONS)
        .map(|((name, meaning), position)| {
            let orientation = if rng.unit() > REVERSED_ODDS {
                UPRIGHT
            } else {
                REVERSED
            };
            Card {
                name: name.to_string(),
                meaning: meaning.to_string(),
                position: position.to_string(),
                orientation: Some(orientation.to_string()),
            }
        })
        .collect();

    let upright = cards
        .iter()
        .filter(|c| c.orientation.as_deref() == Some(UPRIGHT))
        .count();
    let verdict = match upright {
        n if n >= 2 => "整体走向偏积极，只要稳住节奏就能看到进展。",
        1 => "局势有起伏，关键在于当下的取舍。",
        _ => "阻力偏多，建议先整理情绪与边界。",
    };

    let advice = build_advice(&cards);

    Reading {
        symbols: Symbols::Cards(cards),
        verdict: verdict.to_string(),
        advice,
    }
}

fn build_advice(cards: &[Card]) -> Vec<String> {
    let mut advice: Vec<String> = cards
        .iter()
        .map(|card| {
            if card.orientation.as_deref() == Some(REVERSED) {
                format!("留意{}所示的失衡点", card.name)
            } else {
                format!("抓住{}带来的推进力", card.name)
            }
        })
        .collect();
    advice.push("给自己留一个可调整的时间窗口".to_string());
    advice.truncate(3);
    advice
}
