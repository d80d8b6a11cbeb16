use crate::models::analysis::Grade;

/// 0-10 score from alpha strength, volume energy and trend consistency.
///
/// Alpha contributes up to 5, relative volume up to 3, up-days up to 2.
/// A grade B pullback on thin volume gets the full volume points.
pub fn calculate_score(alpha: f64, rvol: f64, trend_days: u32, grade: Grade) -> u8 {
    let s_alpha = if alpha > 0.0 { (alpha / 2.0).clamp(1.0, 5.0) } else { 0.0 };

    let mut s_vol = if rvol >= 200.0 {
        3.0
    } else if rvol >= 120.0 {
        2.0
    } else if rvol >= 80.0 {
        1.0
    } else {
        0.0
    };

    let s_trend = if trend_days >= 4 {
        2.0
    } else if trend_days >= 2 {
        1.0
    } else {
        0.0
    };

    if grade == Grade::B && rvol < 80.0 {
        s_vol = 3.0;
    }

    (s_alpha + s_vol + s_trend).min(10.0) as u8
}

// (anchor score, text) in priority order: ties go to the earlier anchor
const S_DESCRIPTIONS: &[(u8, &str)] = &[
    (10, "천하무적: 시장의 왕"),
    (5, "추세 유지 중인 대장주"),
    (1, "탄력이 둔화되는 대장주"),
];
const A_DESCRIPTIONS: &[(u8, &str)] = &[
    (10, "괴물 신인: 강력한 수급 유입"),
    (5, "추세 전환 시도 중"),
    (1, "단기 반짝 가능성 주의"),
];
const B_DESCRIPTIONS: &[(u8, &str)] = &[
    (10, "황금 눌림목: 완벽한 매수 타점"),
    (5, "박스권 조정 중"),
    (1, "추세 붕괴 위험 경계"),
];
const F_DESCRIPTIONS: &[(u8, &str)] = &[(1, "관심 제외: 시장 소외주")];

/// Text for the anchor score closest to `score`.
pub fn describe(grade: Grade, score: u8) -> &'static str {
    let table = match grade {
        Grade::S => S_DESCRIPTIONS,
        Grade::A => A_DESCRIPTIONS,
        Grade::B => B_DESCRIPTIONS,
        Grade::F => F_DESCRIPTIONS,
    };

    let mut best = table[0];
    for entry in &table[1..] {
        if entry.0.abs_diff(score) < best.0.abs_diff(score) {
            best = *entry;
        }
    }
    best.1
}
