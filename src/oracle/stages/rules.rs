// SPDX-License-Identifier: MIT

//! Deterministic rules the stages fall back on when a model answer is
//! missing, malformed or out of range

use crate::oracle::workflow::state::{Domain, Intent, Tone, Tool, WorkflowState};

const LOVE_KEYWORDS: &[&str] = &[
    "感情", "爱情", "恋爱", "喜欢", "暧昧", "分手", "复合", "对象", "男友", "女友", "相亲", "婚姻",
    "结婚", "关系", "情感", "TA",
];

const CAREER_KEYWORDS: &[&str] = &[
    "工作", "职业", "事业", "升职", "跳槽", "面试", "offer", "薪资", "薪水", "裁员", "同事", "岗位",
    "转正", "考试", "学习", "成绩",
];

const GENTLE_MARKERS: &[&str] = &[
    "请", "希望", "麻烦", "能不能", "可以吗", "想", "温柔", "安慰", "求助",
];

const DIRECT_MARKERS: &[&str] = &[
    "直接", "快点", "说实话", "结论", "结果", "是或否", "只要结果", "别绕",
];

const CAREER_ROUTE_HINTS: &[&str] = &[
    "面试", "offer", "升职", "裁员", "跳槽", "绩效", "简历", "考试", "学习",
];

const DIVINATION_KEYWORDS: &[&str] = &[
    "占卜", "抽牌", "塔罗", "六爻", "雷诺曼", "算一算", "看运势", "问卜", "测一测",
];

/// Questions shorter than this many characters need clarification
const MIN_QUESTION_CHARS: usize = 3;

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// Rule-based classification of a question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub domain: Domain,
    pub tone: Tone,
    pub need_clarification: bool,
}

pub fn parse_question(question: &str) -> Classification {
    let cleaned = question.trim();

    let domain = if contains_any(cleaned, LOVE_KEYWORDS) {
        Domain::Love
    } else if contains_any(cleaned, CAREER_KEYWORDS) {
        Domain::Career
    } else {
        Domain::General
    };

    // Direct markers override gentle ones
    let tone = if contains_any(cleaned, DIRECT_MARKERS) {
        Tone::Direct
    } else if contains_any(cleaned, GENTLE_MARKERS) {
        Tone::Gentle
    } else {
        Tone::Direct
    };

    Classification {
        domain,
        tone,
        need_clarification: cleaned.chars().count() < MIN_QUESTION_CHARS,
    }
}

/// Divination when asked for explicitly, or when the question is a clear
/// love or career concern; chat otherwise
pub fn detect_intent(question: &str, domain: Domain, need_clarification: bool) -> Intent {
    if contains_any(question, DIVINATION_KEYWORDS) {
        return Intent::Divination;
    }
    if domain != Domain::General && !need_clarification {
        return Intent::Divination;
    }
    Intent::Chat
}

pub fn rule_route(question: &str, domain: Domain, tone: Tone) -> Tool {
    if domain == Domain::Career || contains_any(question, CAREER_ROUTE_HINTS) {
        return Tool::Liuyao;
    }
    match tone {
        Tone::Gentle => Tool::Tarot,
        Tone::Direct => Tool::Lenormand,
    }
}

/// Reply used when the narration model gives nothing usable
pub fn fallback_narration(
    tool: Tool,
    verdict: &str,
    advice: &[String],
    tone: Tone,
    need_clarification: bool,
) -> String {
    if !tool.is_divination() {
        return if need_clarification {
            "我在听，可以多说一点你现在的情况吗？".to_string()
        } else {
            "我在这里陪着你。愿意的话可以多说说，也可以让我为你抽一次牌。".to_string()
        };
    }

    let label = tool.label();
    if need_clarification {
        return format!(
            "我需要更多信息来进行{}占问，请补充关键背景或具体时间范围。",
            label
        );
    }

    let verdict = verdict.trim_end_matches('。');
    let advice = advice.join("；");
    match tone {
        Tone::Gentle => format!("从{}的结果看：{}。建议：{}。", label, verdict, advice),
        Tone::Direct => format!("{}解读：{}。建议：{}。", label, verdict, advice),
    }
}

/// The reply for a finished state: its message, or the rule-based one
pub fn reply_for(state: &WorkflowState) -> String {
    match state.message.as_deref().filter(|m| !m.trim().is_empty()) {
        Some(message) => message.to_string(),
        None => fallback_narration(
            state.tool.unwrap_or(Tool::Chat),
            state.verdict(),
            state.advice(),
            state.tone(),
            state.need_clarification(),
        ),
    }
}
