use anyhow::Context;
use std::env;
use tracing::{info, warn};
use umt_portal::{AppError, Portal};
use umt_portal::config::ConfigLoader;
use umt_portal::models::{Credentials, Student};
use umt_portal::observability::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    ConfigLoader::validate(&config)?;
    let _guard = init_tracing(&config.logging);
    info!(base_url = %config.portal.base_url, "Starting UMT Portal...");

    let mut portal = Portal::new(config);

    let canceller = portal.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let reply = match (env::var("UMT_STUDENT_ID"), env::var("UMT_PASSWORD")) {
        (Ok(id), Ok(password)) => {
            let remember = env::var("UMT_REMEMBER").is_ok();
            portal.login(&Credentials::new(id, password), remember).await
        }
        _ => portal.resume().await,
    };
    if !reply.is_ok() {
        anyhow::bail!("login failed ({:?}): {}", reply.code, reply.message);
    }

    match sync_records(&mut portal).await {
        Ok(()) => {}
        Err(AppError::Cancelled) => warn!("sync cancelled, showing partial records"),
        Err(e) => return Err(e.into()),
    }

    print_summary(portal.student());
    info!(metrics = ?portal.metrics().snapshot(), "done");
    Ok(())
}

/// 依次抓取课程、各课程考勤和成绩单；被取消时立即停止
async fn sync_records(portal: &mut Portal) -> umt_portal::Result<()> {
    let courses = portal.get_courses().await?;
    for course in &courses {
        match portal.get_course_attendance(&course.id, false).await {
            Ok(()) => {}
            Err(AppError::Cancelled) => return Err(AppError::Cancelled),
            Err(e) => warn!(course_id = %course.id, error = %e, "attendance unavailable"),
        }
    }

    match portal.get_transcript(false).await {
        Ok(()) => Ok(()),
        Err(AppError::Cancelled) => Err(AppError::Cancelled),
        Err(e) => {
            warn!(error = %e, "transcript unavailable");
            Ok(())
        }
    }
}

fn print_summary(student: &Student) {
    println!("{} ({})", student.name, student.id);
    println!("{} | {}", student.program, student.current_semester);
    println!(
        "CGPA {} | {} / {} credit hours",
        student.cgpa_earned, student.completed_credit_hours, student.required_credit_hours
    );
    println!();

    for course in &student.courses {
        println!(
            "{:<10} {:<40} {:>3}% ({}/{})",
            course.code,
            course.title,
            course.attendance_percentage,
            course.lectures_attended(),
            course.total_lectures
        );
    }
    println!();

    for key in student.transcript.ordered() {
        let semester = &key.semester;
        println!(
            "{:<12} SGPA {:.2}  CGPA {:.2}  {} cr",
            semester.name, semester.sgpa, semester.cgpa, semester.credit_hours_earned
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use umt_portal::config::AppConfig;
    use umt_portal::storage::InMemoryCache;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DASHBOARD: &str = r#"<div class="widget-numbers text-primary">Hamza Tariq</div>"#;

    const COURSES: &str = r#"<table class="table">
        <tr><td>CS301</td><td>Operating Systems</td><td>3</td><td>Core</td><td>Dr. Imran Shah</td>
            <td>imran@umt.edu.pk</td><td>On Campus</td><td>B</td><td>Fall 2024</td>
            <td><a class="assesment" data-assigned-id="9001">View</a></td></tr>
        <tr><td>CS302</td><td>Computer Networks</td><td>3</td><td>Core</td><td>Dr. Imran Shah</td>
            <td>imran@umt.edu.pk</td><td>On Campus</td><td>B</td><td>Fall 2024</td>
            <td><a class="assesment" data-assigned-id="9002">View</a></td></tr>
    </table>"#;

    async fn mount(server: &MockServer, verb: &str, route: &str, body: &str, hits: Option<u64>) {
        let mock = Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body));
        let mock = match hits {
            Some(n) => mock.expect(n),
            None => mock,
        };
        mock.mount(server).await;
    }

    async fn logged_in_portal(server: &MockServer) -> Portal {
        Mock::given(method("GET"))
            .and(path("/Account/Login"))
            .respond_with(ResponseTemplate::new(200).append_header("Set-Cookie", "s=1; Path=/"))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/Account/Login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("Set-Cookie", "a=1; Path=/")
                    .append_header("Set-Cookie", "b=2; Path=/"),
            )
            .mount(server)
            .await;
        mount(server, "GET", "/CourseRequest", DASHBOARD, None).await;
        mount(server, "GET", "/MyCourses", COURSES, None).await;

        let mut portal = Portal::with_cache(
            AppConfig::for_base_url(&server.uri()),
            Arc::new(InMemoryCache::new()),
        );
        let reply = portal.login(&Credentials::new("F2021065123", "pw"), false).await;
        assert!(reply.is_ok(), "{reply:?}");
        portal
    }

    #[tokio::test]
    async fn test_sync_stops_after_cancellation() {
        let server = MockServer::start().await;
        let mut portal = logged_in_portal(&server).await;
        mount(&server, "GET", "/Attendance/ViewAttendance", "", Some(0)).await;
        mount(&server, "GET", "/Transcript", "", Some(0)).await;
        mount(&server, "GET", "/Reports/Transcript.aspx", "", Some(0)).await;

        portal.canceller().cancel();
        let result = sync_records(&mut portal).await;

        assert!(matches!(result, Err(AppError::Cancelled)));
        assert_eq!(portal.student().courses.len(), 2);
        assert_eq!(portal.metrics().snapshot().cancelled_total, 1);
    }
}
