use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use glob::glob;
use html5scrub::{Policy, PolicyBuilder};
use libtest_mimic::{self, Arguments, Trial};
use pretty_assertions::assert_eq;
use regex::Regex;
use serde::Deserialize;

mod testutils;

#[derive(Deserialize)]
struct FixtureFile {
    policy: String,
    tests: Vec<Fixture>,
}

#[derive(Deserialize, Debug, Clone)]
struct Fixture {
    description: String,
    input: String,
    output: String,
}

#[derive(Debug, Clone, Copy)]
enum Source {
    String,
    Reader,
    SlowReader,
}

/// Hands out one byte per `read` call.
struct SlowReader<R>(R);

impl<R: Read> Read for SlowReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match buf.first_mut() {
            Some(first) => self.0.read(std::slice::from_mut(first)),
            None => Ok(0),
        }
    }
}

/// The policy the AntiSamy-derived cases were written against.
fn antisamy() -> Policy {
    let url = Regex::new("(?i)(https?|mailto):.*").unwrap();

    PolicyBuilder::new()
        .allow_elements([
            "a", "b", "br", "div", "font", "i", "img", "input", "li", "ol", "p", "span", "td",
            "ul",
        ])
        .allow_attributes(["checked", "type"])
        .on_elements(["input"])
        .allow_attributes(["color"])
        .on_elements(["font"])
        .allow_attributes(["href"])
        .matching(url.clone())
        .on_elements(["a"])
        .allow_attributes(["src"])
        .matching(url)
        .on_elements(["img"])
        .allow_attributes(["class", "id", "title"])
        .globally()
        .allow_attributes(["char"])
        .matching(Regex::new(r"\p{L}").unwrap())
        .on_elements(["td"])
        .allow_url_schemes(["http", "https", "mailto"])
        .build()
        .unwrap()
}

fn policy_by_name(name: &str) -> Policy {
    match name {
        "strict" => Policy::strict(),
        "ugc" => Policy::ugc(),
        "antisamy" => antisamy(),
        other => panic!("unknown policy {:?}", other),
    }
}

fn produce_testcases_from_file(tests: &mut Vec<Trial>, path: &Path) {
    let fname = path.file_name().unwrap().to_str().unwrap().to_owned();
    let FixtureFile { policy, tests: fixtures } =
        serde_json::from_reader(BufReader::new(File::open(path).unwrap())).unwrap();

    for (i, fixture) in fixtures.into_iter().enumerate() {
        for source in [Source::String, Source::Reader, Source::SlowReader] {
            let fixture = fixture.clone();
            let policy = policy.clone();
            tests.push(Trial::test(
                format!("{}:{}:{:?}:{}", fname, i, source, fixture.description),
                move || {
                    testutils::catch_unwind_and_report(move || {
                        run_test(&policy_by_name(&policy), &fixture, source)
                    })
                },
            ));
        }
    }
}

fn run_test(policy: &Policy, fixture: &Fixture, source: Source) {
    let actual = match source {
        Source::String => policy.sanitize(&fixture.input).unwrap(),
        Source::Reader => {
            let mut out = Vec::new();
            policy
                .sanitize_reader(fixture.input.as_bytes(), &mut out)
                .unwrap();
            String::from_utf8(out).unwrap()
        }
        Source::SlowReader => {
            let mut out = Vec::new();
            policy
                .sanitize_reader(SlowReader(fixture.input.as_bytes()), &mut out)
                .unwrap();
            String::from_utf8(out).unwrap()
        }
    };

    assert_eq!(actual, fixture.output, "input: {:?}", fixture.input);

    // Sanitized output is a fixed point, as long as no text-only element is whitelisted.
    if let Source::String = source {
        assert_eq!(policy.sanitize(&actual).unwrap_or_default(), actual);
    }
}

fn main() {
    let args = Arguments::from_args();

    let mut tests = Vec::new();

    for entry in glob("tests/fixtures/*.json").unwrap() {
        produce_testcases_from_file(&mut tests, &entry.unwrap());
    }

    libtest_mimic::run(&args, tests).exit();
}
