// SPDX-License-Identifier: MIT

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::seed::SeededRng;
use super::{Hexagram, Line, LineValue, Reading, Symbols};

/// Trigram names keyed by line code, bottom line first, yang as `1`
static TRIGRAMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("111", "乾"),
        ("000", "坤"),
        ("001", "震"),
        ("010", "坎"),
        ("011", "艮"),
        ("100", "巽"),
        ("101", "离"),
        ("110", "兑"),
    ])
});

const YIN_ODDS: f64 = 0.45;

/// Cast six lines and read the two trigrams
pub fn cast_liuyao(question: &str, seed_key: &str) -> Reading {
    let mut rng = SeededRng::new("liuyao", seed_key, question);

    let lines: Vec<Line> = (1..=6)
        .map(|line| Line {
            line,
            value: if rng.unit() > YIN_ODDS {
                LineValue::Yang
            } else {
                LineValue::Yin
            },
        })
        .collect();
    let yang = lines.iter().filter(|l| l.value == LineValue::Yang).count();

    let lower = trigram(&lines[..3]);
    let upper = trigram(&lines[3..]);
    let pattern = format!("上{}下{}", upper, lower);

    let (verdict, advice) = match yang {
        n if n >= 4 => (
            format!("卦象为{}，行动力强，适合主动推进。", pattern),
            ["设定明确节点并推进", "优先解决最关键的变量", "保持节奏，不要摇摆"],
        ),
        3 => (
            format!("卦象为{}，局势平衡，适合稳步试探。", pattern),
            ["先小步验证，再扩大投入", "与关键人保持同步", "别急于一锤定音"],
        ),
        _ => (
            format!("卦象为{}，宜先守后动，等待时机明朗。", pattern),
            ["先稳住基本面", "避免被外部噪音影响", "等待下一次明确机会"],
        ),
    };

    Reading {
        symbols: Symbols::Hexagram(Hexagram {
            upper: upper.to_string(),
            lower: lower.to_string(),
            lines,
            pattern,
        }),
        verdict,
        advice: advice.iter().map(|s| s.to_string()).collect(),
    }
}

fn trigram(lines: &[Line]) -> &'static str {
    let code: String = lines
        .iter()
        .map(|l| match l.value {
            LineValue::Yang => '1',
            LineValue::Yin => '0',
        })
        .collect();
    TRIGRAMS.get(code.as_str()).copied().unwrap_or("未知")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: u8, value: LineValue) -> Line {
        Line { line: n, value }
    }

    #[test]
    fn test_six_lines_numbered_bottom_up() {
        let reading = cast_liuyao("面试能过吗", "s");
        let Symbols::Hexagram(hex) = &reading.symbols else {
            panic!("expected hexagram");
        };
        assert_eq!(
            hex.lines.iter().map(|l| l.line).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5, 6]
        );
        assert_eq!(hex.pattern, format!("上{}下{}", hex.upper, hex.lower));
        assert!(reading.verdict.contains(&hex.pattern));
        assert_eq!(reading.advice.len(), 3);
    }

    #[test]
    fn test_trigram_lookup() {
        use LineValue::{Yang, Yin};
        assert_eq!(trigram(&[line(1, Yang), line(2, Yang), line(3, Yang)]), "乾");
        assert_eq!(trigram(&[line(1, Yin), line(2, Yin), line(3, Yang)]), "震");
        assert_eq!(trigram(&[line(1, Yang), line(2, Yin), line(3, Yang)]), "离");
        assert_eq!(trigram(&[line(1, Yin), line(2, Yin)]), "未知");
    }

    #[test]
    fn test_verdict_tracks_yang_count() {
        for i in 0..30 {
            let reading = cast_liuyao(&format!("问题{}", i), "");
            let Symbols::Hexagram(hex) = &reading.symbols else {
                panic!("expected hexagram");
            };
            let yang = hex.lines.iter().filter(|l| l.value == LineValue::Yang).count();
            let marker = match yang {
                n if n >= 4 => "行动力强",
                3 => "局势平衡",
                _ => "宜先守后动",
            };
            assert!(reading.verdict.contains(marker));
        }
    }
}
