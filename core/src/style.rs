use std::collections::BTreeMap;

use colored::{Color, ColoredString, Colorize};
use crossterm::terminal;

use crate::suite::{BuildStatus, SuiteReport};
use crate::testing::{JudgeCode, TestReport};

const BOLD_LINE: &str = "━";
const THIN_LINE: &str = "─";

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for JudgeCode {
    fn color(&self) -> Color {
        use JudgeCode::*;
        if !self::is_truecolor_supported() {
            return match self {
                AC => Color::Green,
                WA => Color::Yellow,
                TLE => Color::Red,
                RE => Color::Magenta,
                IE => Color::BrightBlack,
            };
        }

        match self {
            AC => Color::TrueColor {
                r: 30,
                g: 180,
                b: 40,
            },
            WA => Color::TrueColor {
                r: 210,
                g: 138,
                b: 4,
            },
            TLE => Color::TrueColor {
                r: 220,
                g: 42,
                b: 42,
            },
            RE => Color::TrueColor {
                r: 171,
                g: 40,
                b: 200,
            },
            IE => Color::TrueColor {
                r: 110,
                g: 110,
                b: 110,
            },
        }
    }
}

fn badge(label: &str, bg: Color) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightBlack
    };
    format!(" {} ", label).on_color(bg).bold().color(fg)
}

pub fn judge_icon(judge: JudgeCode) -> ColoredString {
    badge(&judge.to_string(), judge.color())
}

pub fn memcheck_icon() -> ColoredString {
    badge("MEM", Color::BrightRed)
}

fn terminal_cols() -> usize {
    let (cols, _) = terminal::size().unwrap_or((60, 40));
    cols.max(20) as usize
}

/// `Testcase <name> ... AC  [12ms]`, plus a MEM badge for memory violations.
pub fn format_test_result_line(res: &TestReport) -> String {
    let judge = res.judge.to_string();
    let mem = if res.is_memory_unsafe() {
        format!(" {}", memcheck_icon())
    } else {
        String::new()
    };
    format!(
        "{} {} ... {}{}{} [{}ms]",
        "Testcase".cyan(),
        res.name,
        judge_icon(res.judge),
        " ".repeat(3usize.saturating_sub(judge.len())),
        mem,
        res.execution_time.as_millis(),
    )
}

fn print_sub_title(s: &str, cols: usize) {
    println!(
        "{}{}",
        s.cyan().bold(),
        THIN_LINE.repeat(cols.saturating_sub(s.len() + 1)).bright_black(),
    )
}

fn print_text(text: &str) {
    if text.is_empty() {
        println!("{}", "<EMPTY>".magenta().dimmed());
    } else {
        println!("{}", text);
    }
}

pub fn print_test_result_detail(res: &TestReport) {
    let cols = terminal_cols();
    let bold_bar = BOLD_LINE.repeat(cols).blue().bold();

    println!(
        "\n{}: {} [{}ms]\n{}",
        res.name.color(Color::BrightYellow).bold(),
        judge_icon(res.judge),
        res.execution_time.as_millis(),
        bold_bar,
    );

    if let Some(err) = &res.error {
        print_sub_title("[error]", cols);
        println!("{}", err.bright_red());
    }

    if res.judge != JudgeCode::AC && res.judge != JudgeCode::IE {
        print_sub_title("[expected]", cols);
        print_text(res.expected.as_str());
        print_sub_title("[actual]", cols);
        print_text(res.actual.as_str());
    }

    if let Some(verdict) = res.memcheck.as_ref().filter(|v| v.is_unsafe) {
        print_sub_title("[memcheck]", cols);
        print_text(verdict.output.trim_end());
    }

    println!("{}", bold_bar);
}

/// Failed tests per badge. A harness error on an otherwise accepted test
/// counts as `IE`.
fn count_failure_kinds(results: &[TestReport]) -> BTreeMap<String, (ColoredString, usize)> {
    let mut count: BTreeMap<String, (ColoredString, usize)> = BTreeMap::new();
    for r in results {
        let judge = match (r.judge, &r.error) {
            (JudgeCode::AC, Some(_)) => Some(JudgeCode::IE),
            (JudgeCode::AC, None) => None,
            (judge, _) => Some(judge),
        };
        if let Some(judge) = judge {
            count
                .entry(judge.to_string())
                .or_insert_with(|| (judge_icon(judge), 0))
                .1 += 1;
        }
        if r.is_memory_unsafe() {
            count
                .entry("MEM".to_owned())
                .or_insert_with(|| (memcheck_icon(), 0))
                .1 += 1;
        }
    }
    count
}

pub fn print_test_result_summary(results: &[TestReport]) {
    let bar = "-".repeat(5);
    print!("{} ", bar);

    let num_total_test = results.len();
    let num_failed = results.iter().filter(|r| r.failed()).count();

    if num_failed == 0 {
        let msg = format!("All {} tests passed", num_total_test);
        print!("{}", msg.green());
    } else {
        let summary_msg = if num_failed < num_total_test {
            format!("{}/{} tests failed", num_failed, num_total_test)
        } else {
            format!("All {} tests failed", num_total_test)
        };

        let count = count_failure_kinds(results);
        let detail_msg = count
            .values()
            .map(|(icon, cnt)| {
                format!(
                    "{}{}{}",
                    icon,
                    "x".dimmed(),
                    cnt.to_string().bold().bright_white(),
                )
            })
            .collect::<Vec<String>>()
            .join(", ");

        print!("{} ({})", summary_msg.bright_red(), detail_msg);
    }

    println!(" {}", bar);
}

pub fn print_build_failure(status: &BuildStatus) {
    let BuildStatus::Failed { failure, output } = status else {
        return
    };
    let cols = terminal_cols();
    print_sub_title("[build]", cols);
    if !output.trim().is_empty() {
        println!("{}", output.trim_end());
    }
    println!("{}", failure.to_string().bright_red().bold());
}

pub fn print_suite_report(report: &SuiteReport) {
    if report.build_failed() {
        print_build_failure(&report.build);
        return;
    }
    report
        .tests
        .iter()
        .filter(|r| r.failed())
        .for_each(print_test_result_detail);

    print_test_result_summary(&report.tests);
}
