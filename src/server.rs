use std::convert::Infallible;
use std::net::SocketAddr;

use chrono::{Local, NaiveDateTime};
use tracing::info;
use warp::filters::body::BodyDeserializeError;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reject::{InvalidQuery, MethodNotAllowed};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::error::Result;
use crate::program::{ProgramId, ProgramUpdate};
use crate::reply;
use crate::service::ScheduleService;
use crate::store::ProgramStore;
use crate::youtube::YouTubeClient;

use self::types::{
    AddProgramBody, DateQuery, DeleteBody, Deleted, FillerBody, GridQuery, NowPlayingView,
    ProgramView, ReorderBody, Reordered, VideoQuery,
};

mod types;

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn with<T: Clone + Send + Sync + 'static>(
    value: T,
) -> impl Filter<Extract = (T,), Error = Infallible> + Clone {
    warp::any().map(move || value.clone())
}

/// Runs a storage-bound call off the async workers.
async fn blocking<T, F>(call: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(call).await?
}

pub fn make_server<S: ProgramStore>(
    service: ScheduleService<S>,
    youtube: YouTubeClient,
) -> BoxedFilter<(Response,)> {
    let channels = warp::path!("channels")
        .and(warp::get())
        .and(with(service.clone()))
        .and_then(|service: ScheduleService<S>| async move {
            let result = blocking(move || service.channels()).await;
            Ok::<_, Infallible>(reply::json(result))
        });

    let programs = warp::path!("channels" / String / "programs")
        .and(warp::get())
        .and(with(service.clone()))
        .and_then(|channel_id: String, service: ScheduleService<S>| async move {
            let now = now();
            let result = blocking(move || service.programs_for_channel(&channel_id, now)).await;
            Ok::<_, Infallible>(reply::json(
                result.map(|programs| ProgramView::all(programs, now)),
            ))
        });

    let schedule = warp::path!("channels" / String / "schedule")
        .and(warp::get())
        .and(warp::query::<DateQuery>())
        .and(with(service.clone()))
        .and_then(
            |channel_id: String, query: DateQuery, service: ScheduleService<S>| async move {
                let result =
                    blocking(move || service.day_schedule(&channel_id, query.date, now())).await;
                Ok::<_, Infallible>(reply::json(result))
            },
        );

    let now_playing = warp::path!("channels" / String / "now")
        .and(warp::get())
        .and(with(service.clone()))
        .and_then(|channel_id: String, service: ScheduleService<S>| async move {
            let now = now();
            let result = blocking(move || service.now_playing(&channel_id, now)).await;
            Ok::<_, Infallible>(reply::json(
                result.map(|playing| NowPlayingView::at(playing, now)),
            ))
        });

    let add_program = warp::path!("channels" / String / "programs")
        .and(warp::post())
        .and(warp::body::json::<AddProgramBody>())
        .and(with(service.clone()))
        .and(with(youtube.clone()))
        .and_then(add_program::<S>);

    let add_filler = warp::path!("channels" / String / "filler")
        .and(warp::post())
        .and(warp::body::json::<FillerBody>())
        .and(with(service.clone()))
        .and_then(
            |channel_id: String, body: FillerBody, service: ScheduleService<S>| async move {
                let result = blocking(move || service.add_filler(&channel_id, body.date)).await;
                Ok::<_, Infallible>(reply::created(result))
            },
        );

    let reorder = warp::path!("channels" / String / "reorder")
        .and(warp::post())
        .and(warp::body::json::<ReorderBody>())
        .and(with(service.clone()))
        .and_then(
            |channel_id: String, body: ReorderBody, service: ScheduleService<S>| async move {
                let result = blocking(move || {
                    service.reorder_day(&channel_id, body.date, &body.order, now())
                })
                .await;
                Ok::<_, Infallible>(reply::json(result.map(Reordered::from)))
            },
        );

    let grid = warp::path!("grid")
        .and(warp::get())
        .and(warp::query::<GridQuery>())
        .and(with(service.clone()))
        .and_then(|query: GridQuery, service: ScheduleService<S>| async move {
            let now = now();
            let date = query.date.unwrap_or(now.date());
            let result = blocking(move || service.grid(date)).await;
            Ok::<_, Infallible>(reply::json(
                result.map(|programs| ProgramView::all(programs, now)),
            ))
        });

    let video = warp::path!("videos")
        .and(warp::get())
        .and(warp::query::<VideoQuery>())
        .and(with(youtube))
        .and_then(|query: VideoQuery, youtube: YouTubeClient| async move {
            Ok::<_, Infallible>(reply::json(youtube.fetch_video_details(&query.url).await))
        });

    let update = warp::path!("programs" / ProgramId)
        .and(warp::patch())
        .and(warp::body::json::<ProgramUpdate>())
        .and(with(service.clone()))
        .and_then(
            |id: ProgramId, update: ProgramUpdate, service: ScheduleService<S>| async move {
                let result = blocking(move || service.update_program(id, &update)).await;
                Ok::<_, Infallible>(reply::json(result))
            },
        );

    let delete = warp::path!("programs" / ProgramId)
        .and(warp::delete())
        .and(with(service.clone()))
        .and_then(|id: ProgramId, service: ScheduleService<S>| async move {
            let result = blocking(move || service.delete_program(id)).await;
            Ok::<_, Infallible>(reply::no_content(result))
        });

    let delete_many = warp::path!("programs" / "delete")
        .and(warp::post())
        .and(warp::body::json::<DeleteBody>())
        .and(with(service))
        .and_then(|body: DeleteBody, service: ScheduleService<S>| async move {
            let result = blocking(move || service.delete_programs(&body.ids)).await;
            Ok::<_, Infallible>(reply::json(result.map(|deleted| Deleted { deleted })))
        });

    channels
        .or(programs)
        .unify()
        .or(schedule)
        .unify()
        .or(now_playing)
        .unify()
        .or(add_program)
        .unify()
        .or(add_filler)
        .unify()
        .or(reorder)
        .unify()
        .or(grid)
        .unify()
        .or(video)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(delete_many)
        .unify()
        .recover(recover)
        .unify()
        .boxed()
}

async fn add_program<S: ProgramStore>(
    channel_id: String,
    body: AddProgramBody,
    service: ScheduleService<S>,
    youtube: YouTubeClient,
) -> std::result::Result<Response, Infallible> {
    let result = async move {
        let video = youtube.fetch_video_details(&body.url).await?;
        blocking(move || {
            service.append_video(&channel_id, body.date, &video, body.confirm_overflow)
        })
        .await
    }
    .await;
    Ok(reply::created(result))
}

async fn recover(rejection: Rejection) -> std::result::Result<Response, Rejection> {
    if rejection.is_not_found() {
        return Ok(reply::refused(StatusCode::NOT_FOUND, "no such route"));
    }
    if let Some(err) = rejection.find::<BodyDeserializeError>() {
        return Ok(reply::refused(StatusCode::BAD_REQUEST, err.to_string()));
    }
    if let Some(err) = rejection.find::<InvalidQuery>() {
        return Ok(reply::refused(StatusCode::BAD_REQUEST, err.to_string()));
    }
    if rejection.find::<MethodNotAllowed>().is_some() {
        return Ok(reply::refused(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"));
    }
    Err(rejection)
}

pub async fn serve<S: ProgramStore>(
    service: ScheduleService<S>,
    youtube: YouTubeClient,
    bind: SocketAddr,
) -> anyhow::Result<()> {
    let routes = make_server(service, youtube).with(warp::trace::request());
    let (addr, server) = warp::serve(routes).try_bind_with_graceful_shutdown(bind, async {
        let _ = tokio::signal::ctrl_c().await;
    })?;
    info!(%addr, "listening");
    server.await;
    info!("server stopped");
    Ok(())
}
