use crate::controller::orchestration::RecommendController;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) controller: RecommendController,
}
